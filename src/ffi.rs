//! FFI bindings for the lane pattern classifier
//!
//! This module provides C-compatible functions for embedding the classifier in a
//! game host. Strings are null-terminated; strings returned by these functions must be
//! freed with `lanes_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::classifier::PatternClassifier;
use crate::config::ClassifierConfig;
use crate::replay::{trail_to_frames_json, ReplayMode};
use crate::types::LaneEvent;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Parse an optional config pointer; NULL means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<ClassifierConfig, String> {
    if config_json.is_null() {
        return Ok(ClassifierConfig::default());
    }
    let json = cstr_to_string(config_json).ok_or("Invalid config string pointer")?;
    ClassifierConfig::from_json(&json).map_err(|e| e.to_string())
}

// ============================================================================
// Classifier Handle API
// ============================================================================

/// Opaque handle to a PatternClassifier
pub struct LanesClassifierHandle {
    classifier: PatternClassifier,
}

/// Create a classifier.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - Must be freed with `lanes_classifier_free`.
/// - Returns NULL on error; call `lanes_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lanes_classifier_new(
    config_json: *const c_char,
) -> *mut LanesClassifierHandle {
    clear_last_error();

    let config = match config_from_ptr(config_json) {
        Ok(c) => c,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    match PatternClassifier::with_config(config) {
        Ok(classifier) => Box::into_raw(Box::new(LanesClassifierHandle { classifier })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a classifier.
///
/// # Safety
/// - `handle` must be a pointer returned by `lanes_classifier_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lanes_classifier_free(handle: *mut LanesClassifierHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Record a lane interaction.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `lanes_classifier_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn lanes_classifier_ingest(
    handle: *mut LanesClassifierHandle,
    lane: u8,
    timestamp_ms: f64,
    success: bool,
) -> i32 {
    clear_last_error();

    let handle = match handle.as_mut() {
        Some(h) => h,
        None => {
            set_last_error("Null classifier pointer");
            return -1;
        }
    };

    handle
        .classifier
        .ingest(LaneEvent::new(lane, timestamp_ms, success));
    0
}

/// Classify the current window and return the analysis as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `lanes_classifier_new`.
/// - Returns a newly allocated string that must be freed with `lanes_free_string`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn lanes_classifier_classify(
    handle: *mut LanesClassifierHandle,
) -> *mut c_char {
    clear_last_error();

    let handle = match handle.as_mut() {
        Some(h) => h,
        None => {
            set_last_error("Null classifier pointer");
            return ptr::null_mut();
        }
    };

    let analysis = handle.classifier.analyze();
    match serde_json::to_string(&analysis) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Reset the classifier for a new round.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `lanes_classifier_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn lanes_classifier_reset(handle: *mut LanesClassifierHandle) -> i32 {
    clear_last_error();

    match handle.as_mut() {
        Some(h) => {
            h.classifier.reset();
            0
        }
        None => {
            set_last_error("Null classifier pointer");
            -1
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Replay a click-trail JSON document and return classification frames as JSON.
///
/// # Safety
/// - `trail_json` must be a valid null-terminated C string.
/// - `config_json` may be NULL for defaults.
/// - `poll_interval_ms <= 0` classifies after every event instead of polling.
/// - Returns a newly allocated string that must be freed with `lanes_free_string`.
/// - Returns NULL on error; call `lanes_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lanes_trail_to_frames(
    trail_json: *const c_char,
    config_json: *const c_char,
    poll_interval_ms: f64,
) -> *mut c_char {
    clear_last_error();

    let trail = match cstr_to_string(trail_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid trail string pointer");
            return ptr::null_mut();
        }
    };

    let config = match config_from_ptr(config_json) {
        Ok(c) => c,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    let mode = if poll_interval_ms > 0.0 {
        ReplayMode::Poll {
            interval_ms: poll_interval_ms,
        }
    } else {
        ReplayMode::PerEvent
    };

    match trail_to_frames_json(&trail, &config, mode) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a lanes function.
///
/// # Safety
/// - `ptr` must be a pointer returned by a lanes function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lanes_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - The returned pointer is valid until the next lanes call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn lanes_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn lanes_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        lanes_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_classifier_lifecycle() {
        unsafe {
            let handle = lanes_classifier_new(ptr::null());
            assert!(!handle.is_null());

            for (i, lane) in [1u8, 2, 3, 4, 5].into_iter().enumerate() {
                assert_eq!(lanes_classifier_ingest(handle, lane, i as f64 * 100.0, true), 0);
            }

            let json = take_string(lanes_classifier_classify(handle));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["classification"]["type"], "sequential");

            assert_eq!(lanes_classifier_reset(handle), 0);
            let json = take_string(lanes_classifier_classify(handle));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["classification"]["type"], "unknown");

            lanes_classifier_free(handle);
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        unsafe {
            let config = CString::new(r#"{"window_size": 0}"#).unwrap();
            let handle = lanes_classifier_new(config.as_ptr());
            assert!(handle.is_null());

            let error = lanes_last_error();
            assert!(!error.is_null());
            let message = CStr::from_ptr(error).to_str().unwrap();
            assert!(message.contains("window_size"));
        }
    }

    #[test]
    fn test_ffi_oversized_gap_rejected() {
        unsafe {
            let config = CString::new(r#"{"max_chain_gap": 18446744073709551615}"#).unwrap();
            assert!(lanes_classifier_new(config.as_ptr()).is_null());

            let message = CStr::from_ptr(lanes_last_error()).to_str().unwrap();
            assert!(message.contains("max_chain_gap"));
        }
    }

    #[test]
    fn test_ffi_null_handle() {
        unsafe {
            assert_eq!(lanes_classifier_ingest(ptr::null_mut(), 1, 0.0, true), -1);
            assert!(lanes_classifier_classify(ptr::null_mut()).is_null());
            assert_eq!(lanes_classifier_reset(ptr::null_mut()), -1);
            assert!(!lanes_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_trail_to_frames() {
        unsafe {
            let trail = CString::new(
                r#"{"points": [{"lane": "C"}, {"lane": "D", "timeSec": 0.1}]}"#,
            )
            .unwrap();
            let json = take_string(lanes_trail_to_frames(trail.as_ptr(), ptr::null(), 0.0));
            let frames: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(frames.as_array().unwrap().len(), 2);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = CStr::from_ptr(lanes_version()).to_str().unwrap();
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }
}
