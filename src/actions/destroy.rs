//! `DELETE /model/{id}`

use super::{ActionContext, BlueprintResponse, key_criteria};
use crate::core::error::{BlueprintError, BlueprintResult};
use crate::core::model::Record;

/// Remove a record, or flag it as deleted when `deleted_flag` is on
pub async fn destroy(ctx: &mut ActionContext<'_>) -> BlueprintResult<BlueprintResponse> {
    let util = ctx.util();
    let key = util.require_pk(false)?;
    let criteria = key_criteria(ctx.model, &key);

    let record = ctx
        .model
        .find_one(&criteria, &[])
        .await?
        .ok_or_else(|| BlueprintError::not_found("No record found with the specified `id`."))?;

    if !util.valid_ownership(&record, false) {
        return Err(BlueprintError::unauthorized("you do not own this record"));
    }

    if ctx.options.deleted_flag {
        let mut flag = Record::new();
        flag.insert(
            ctx.options.deleted_attr.clone(),
            ctx.options.deleted_value.clone(),
        );
        ctx.model.update(&criteria, flag).await?;
    } else {
        ctx.model.destroy(&criteria).await?;
    }

    ctx.state.primary_record = Some(record);

    Ok(BlueprintResponse::no_content())
}
