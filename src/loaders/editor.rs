//! Editable text; edits are kept as drafts keyed by object

use async_trait::async_trait;

use super::fetch::get_object;
use super::{check_gate, LoadContext, Loader};
use crate::core::{ChangeHandler, ObjectHandle, PreviewData};
use crate::error::Result;

pub struct EditorLoader;

#[async_trait]
impl Loader for EditorLoader {
    fn name(&self) -> &'static str {
        "editor"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let drafts = ctx.env.drafts.clone();
        let value = match drafts.get(&handle.location) {
            Some(draft) => draft,
            None => {
                check_gate(ctx, handle).await?;
                let object = get_object(ctx.env.store.as_ref(), handle).await?;
                String::from_utf8_lossy(&object.body).into_owned()
            }
        };

        let location = handle.location.clone();
        let on_change = ChangeHandler::new(move |value| drafts.set(location.clone(), value));
        Ok(PreviewData::Editor { value, on_change })
    }
}
