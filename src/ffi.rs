//! C FFI layer for cross-language interoperability.

use crate::parser::{compile, CompileConfig};
use crate::reference::{parse_exact, parse_partial};
use libc::c_char;
use std::ffi::{CStr, CString};
use std::ptr;

/// Result type for FFI operations.
#[repr(C)]
pub struct TbmResult {
    /// Pointer to a JSON string (caller must free with tbm_free_string)
    pub data: *mut c_char,
    /// Error message if data is null (caller must free with tbm_free_string)
    pub error: *mut c_char,
}

impl TbmResult {
    fn ok(data: String) -> Self {
        let c_string = CString::new(data).unwrap_or_default();
        Self {
            data: c_string.into_raw(),
            error: ptr::null_mut(),
        }
    }

    fn err(error: String) -> Self {
        let c_string = CString::new(error).unwrap_or_default();
        Self {
            data: ptr::null_mut(),
            error: c_string.into_raw(),
        }
    }

    fn json<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => Self::ok(json),
            Err(e) => Self::err(format!("Serialization error: {}", e)),
        }
    }
}

/// Read a required UTF-8 argument.
unsafe fn arg<'a>(s: *const c_char, name: &str) -> Result<&'a str, TbmResult> {
    if s.is_null() {
        return Err(TbmResult::err(format!("Null {} pointer", name)));
    }
    CStr::from_ptr(s)
        .to_str()
        .map_err(|_| TbmResult::err(format!("Invalid UTF-8 in {}", name)))
}

/// Compile a textbook document to its JSON chapter map.
///
/// # Safety
///
/// - `source`, `namespace` and `book` must be valid null-terminated UTF-8 strings.
/// - The returned result must be freed with `tbm_free_result`.
#[no_mangle]
pub unsafe extern "C" fn tbm_compile(
    source: *const c_char,
    namespace: *const c_char,
    book: *const c_char,
) -> TbmResult {
    let source = match arg(source, "source") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let namespace = match arg(namespace, "namespace") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let book = match arg(book, "book") {
        Ok(s) => s,
        Err(e) => return e,
    };

    match compile(source, &CompileConfig::new(namespace, book)) {
        Ok(book) => TbmResult::json(&book),
        Err(e) => TbmResult::err(e.to_string()),
    }
}

/// Parse a complete reference string to JSON.
///
/// # Safety
///
/// - `text` must be a valid null-terminated UTF-8 string.
/// - The returned result must be freed with `tbm_free_result`.
#[no_mangle]
pub unsafe extern "C" fn tbm_parse_reference(text: *const c_char) -> TbmResult {
    let text = match arg(text, "reference") {
        Ok(t) => t,
        Err(e) => return e,
    };

    match parse_exact(text) {
        Some(reference) => TbmResult::json(&reference),
        None => TbmResult::err(format!("Invalid reference: {:?}", text)),
    }
}

/// Parse a possibly incomplete reference string to JSON.
///
/// # Safety
///
/// - `text` must be a valid null-terminated UTF-8 string.
/// - The returned result must be freed with `tbm_free_result`.
#[no_mangle]
pub unsafe extern "C" fn tbm_parse_partial_reference(text: *const c_char) -> TbmResult {
    let text = match arg(text, "reference") {
        Ok(t) => t,
        Err(e) => return e,
    };

    match parse_partial(text) {
        Some(partial) => TbmResult::json(&partial),
        None => TbmResult::err(format!("Unrecognized reference prefix: {:?}", text)),
    }
}

/// Free a string returned by tbm functions.
///
/// # Safety
///
/// - `s` must be a pointer returned by a tbm function, or null.
#[no_mangle]
pub unsafe extern "C" fn tbm_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Free a result struct.
///
/// # Safety
///
/// - `result` must be a valid TbmResult.
#[no_mangle]
pub unsafe extern "C" fn tbm_free_result(result: TbmResult) {
    tbm_free_string(result.data);
    tbm_free_string(result.error);
}

/// Get the library version.
///
/// The returned string is static and must not be freed.
#[no_mangle]
pub extern "C" fn tbm_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take(ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            None
        } else {
            let s = CStr::from_ptr(ptr).to_string_lossy().into_owned();
            tbm_free_string(ptr);
            Some(s)
        }
    }

    #[test]
    fn test_compile_roundtrip() {
        let source = CString::new("# 1 One\n\n<result id=\"1.1\">x</result>").unwrap();
        let ns = CString::new("acme").unwrap();
        let book = CString::new("v1").unwrap();

        unsafe {
            let result = tbm_compile(source.as_ptr(), ns.as_ptr(), book.as_ptr());
            assert!(result.error.is_null());
            let json = take(result.data).unwrap();
            assert!(json.contains("acme:v1/result/1.1"));
        }
    }

    #[test]
    fn test_compile_error() {
        let source = CString::new("## 1.1 Lost").unwrap();
        let ns = CString::new("acme").unwrap();

        unsafe {
            let result = tbm_compile(source.as_ptr(), ns.as_ptr(), ptr::null());
            assert!(result.data.is_null());
            assert_eq!(take(result.error).unwrap(), "Null book pointer");

            let book = CString::new("v1").unwrap();
            let result = tbm_compile(source.as_ptr(), ns.as_ptr(), book.as_ptr());
            assert!(take(result.error).unwrap().contains("no open parent"));
        }
    }

    #[test]
    fn test_parse_reference() {
        let text = CString::new("acme:v1/text/1.1.3(ii..xv)").unwrap();
        let bad = CString::new("acme:v1/text/").unwrap();

        unsafe {
            let json = take(tbm_parse_reference(text.as_ptr()).data).unwrap();
            assert!(json.contains("\"listItemRangeStart\":\"ii\""));

            let result = tbm_parse_reference(bad.as_ptr());
            assert!(result.data.is_null());
            tbm_free_result(result);

            let json = take(tbm_parse_partial_reference(bad.as_ptr()).data).unwrap();
            assert!(json.contains("\"type\":\"text\""));
        }
    }

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(tbm_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
