//! WebAssembly bindings for JavaScript/TypeScript.

#![cfg(feature = "wasm")]

use crate::parser::{compile, CompileConfig};
use crate::reference::{parse_exact, parse_partial};
use wasm_bindgen::prelude::*;

/// Compile a textbook document.
///
/// # Returns
///
/// The chapter map as a JSON string.
#[wasm_bindgen(js_name = compileBook)]
pub fn compile_book(source: &str, namespace: &str, book: &str) -> Result<String, JsError> {
    let config = CompileConfig::new(namespace, book);
    let book = compile(source, &config).map_err(|e| JsError::new(&e.to_string()))?;
    book.to_json().map_err(|e| JsError::new(&e.to_string()))
}

/// Parse a complete reference string.
///
/// Returns the reference as JSON, or `undefined` if the text is not a
/// valid reference.
#[wasm_bindgen(js_name = parseReference)]
pub fn parse_reference(text: &str) -> Result<Option<String>, JsError> {
    parse_exact(text)
        .map(|r| serde_json::to_string(&r))
        .transpose()
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Parse a reference the user is still typing.
#[wasm_bindgen(js_name = parsePartialReference)]
pub fn parse_partial_reference(text: &str) -> Result<Option<String>, JsError> {
    parse_partial(text)
        .map(|r| serde_json::to_string(&r))
        .transpose()
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Get the library version.
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// TypeScript type definitions for documentation
/// ```typescript
/// // textbook_markup.d.ts
///
/// /**
///  * Compile a textbook document.
///  * @returns JSON map from chapter id to chapter tree
///  */
/// export function compileBook(source: string, namespace: string, book: string): string;
///
/// /** Parse a complete reference; undefined when invalid. */
/// export function parseReference(text: string): string | undefined;
///
/// /** Parse a reference prefix; undefined when unrecognizable. */
/// export function parsePartialReference(text: string): string | undefined;
///
/// export function getVersion(): string;
/// ```
const _: () = ();
