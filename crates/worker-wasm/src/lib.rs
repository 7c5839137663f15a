//! WASM-compatible wrapper for building and exporting comparison decks.
//!
//! Exposes the deck pipeline and the declarative exporter to JavaScript.
//! The capture backend needs a host rendering surface and is not exposed.

use opsdeck_compose::DeclarativeDocumentExporter;
use opsdeck_core::{
    DeckExporter, DeckOptions, DeckPipeline, ExportRequest, ExportedDocument, ResolvedSlide,
    WeekId, WeeklySnapshot,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Resolved slide order for a set of snapshots.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckPlan {
    pub weeks: Vec<WeekId>,
    pub slides: Vec<ResolvedSlide>,
}

/// Build the default deck and return its slides in export order.
///
/// # Arguments
/// * `snapshots` - Array of weekly snapshot objects
/// * `weeks` - Array of week identifiers, in comparison order
/// * `options` - Optional deck options as a JSON string
#[wasm_bindgen]
pub fn build_deck_plan(
    snapshots: JsValue,
    weeks: JsValue,
    options: Option<String>,
) -> Result<JsValue, JsValue> {
    let (snapshots, weeks) = decode_inputs(snapshots, weeks)?;
    let plan = build_deck_plan_impl(&snapshots, &weeks, options.as_deref())
        .map_err(|e| JsValue::from_str(&e))?;

    serde_wasm_bindgen::to_value(&plan)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Build the default deck and export it with the declarative backend.
///
/// # Returns
/// An object `{ fileName, pageCount, bytes }` where `bytes` is a
/// `Uint8Array` holding the document.
#[wasm_bindgen]
pub fn export_declarative(
    snapshots: JsValue,
    weeks: JsValue,
    options: Option<String>,
) -> Result<JsValue, JsValue> {
    let (snapshots, weeks) = decode_inputs(snapshots, weeks)?;
    let document = export_declarative_impl(&snapshots, &weeks, options.as_deref())
        .map_err(|e| JsValue::from_str(&e))?;

    let result = js_sys::Object::new();
    js_sys::Reflect::set(&result, &"fileName".into(), &document.file_name.as_str().into())?;
    js_sys::Reflect::set(
        &result,
        &"pageCount".into(),
        &JsValue::from(document.page_keys.len() as u32),
    )?;
    js_sys::Reflect::set(
        &result,
        &"bytes".into(),
        &js_sys::Uint8Array::from(document.bytes.as_slice()).into(),
    )?;
    Ok(result.into())
}

fn decode_inputs(snapshots: JsValue, weeks: JsValue) -> Result<(Vec<WeeklySnapshot>, Vec<WeekId>), JsValue> {
    let snapshots: Vec<WeeklySnapshot> = serde_wasm_bindgen::from_value(snapshots)
        .map_err(|e| JsValue::from_str(&format!("Invalid snapshots array: {}", e)))?;
    let weeks: Vec<WeekId> = serde_wasm_bindgen::from_value(weeks)
        .map_err(|e| JsValue::from_str(&format!("Invalid weeks array: {}", e)))?;
    Ok((snapshots, weeks))
}

fn load_options(options: Option<&str>) -> Result<DeckOptions, String> {
    match options {
        Some(json) if !json.trim().is_empty() => {
            DeckOptions::from_json(json).map_err(|e| format!("Invalid options: {}", e))
        }
        _ => Ok(DeckOptions::default()),
    }
}

fn build_deck_plan_impl(
    snapshots: &[WeeklySnapshot],
    weeks: &[WeekId],
    options: Option<&str>,
) -> Result<DeckPlan, String> {
    let options = load_options(options)?;
    let deck = DeckPipeline::new(&options)
        .build_deck(snapshots, weeks)
        .map_err(|e| e.to_string())?;

    Ok(DeckPlan {
        weeks: deck.weeks().to_vec(),
        slides: deck.resolved(),
    })
}

fn export_declarative_impl(
    snapshots: &[WeeklySnapshot],
    weeks: &[WeekId],
    options: Option<&str>,
) -> Result<ExportedDocument, String> {
    let options = load_options(options)?;
    let deck = DeckPipeline::new(&options)
        .build_deck(snapshots, weeks)
        .map_err(|e| e.to_string())?;
    let request = ExportRequest::from_deck(&deck).map_err(|e| e.to_string())?;

    DeclarativeDocumentExporter::new(&options)
        .export(&request, &mut |_| {})
        .map_err(|e| format!("Export failed: {}", e))
}
