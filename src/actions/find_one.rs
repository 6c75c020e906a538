//! `GET /model/{id}`

use super::{ActionContext, BlueprintResponse, key_criteria};
use crate::core::error::{BlueprintError, BlueprintResult};
use serde_json::Value;

pub async fn find_one(ctx: &mut ActionContext<'_>) -> BlueprintResult<BlueprintResponse> {
    let util = ctx.util();
    let key = util.require_pk(false)?;

    let mut criteria = key_criteria(ctx.model, &key);
    criteria.extend(util.check_deleted_flag());

    let record = ctx
        .model
        .find_one(&criteria, &util.populate_each())
        .await?
        .ok_or_else(|| BlueprintError::not_found("No record found with the specified `id`."))?;

    if !util.valid_ownership(&record, false) {
        return Err(BlueprintError::unauthorized("you do not own this record"));
    }

    ctx.state.primary_record = Some(record.clone());

    let mut body = Value::Object(record);
    util.omit_fields(&mut body);

    Ok(BlueprintResponse::ok(body))
}
