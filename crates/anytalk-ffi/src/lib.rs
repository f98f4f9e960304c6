//! C-compatible embedding API.
//!
//! ```c
//! AnytalkContext *anytalk_init(const AnytalkConfig *config,
//!                              AnytalkEventCallback cb, void *user_data);
//! void anytalk_destroy(AnytalkContext *ctx);
//! int  anytalk_start(AnytalkContext *ctx);
//! int  anytalk_stop(AnytalkContext *ctx);
//! int  anytalk_cancel(AnytalkContext *ctx);
//! ```
//!
//! The callback receives NUL-terminated UTF-8 text valid only for the
//! duration of the call, and may be invoked from background threads.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;
use std::str::FromStr;
use std::sync::Arc;

use tracing::warn;

use anytalk_core::Context;
use anytalk_foundation::{AsrConfig, AsrEvent, EventSink, Mode};

pub const ANYTALK_EVENT_PARTIAL: c_int = 0;
pub const ANYTALK_EVENT_FINAL: c_int = 1;
pub const ANYTALK_EVENT_STATUS: c_int = 2;
pub const ANYTALK_EVENT_ERROR: c_int = 3;

/// Mirrors the C struct: required credentials plus two optional fields
/// that fall back to the service defaults when NULL.
#[repr(C)]
pub struct AnytalkConfig {
    pub app_id: *const c_char,
    pub access_token: *const c_char,
    pub resource_id: *const c_char,
    pub mode: *const c_char,
}

pub type AnytalkEventCallback =
    Option<unsafe extern "C" fn(user_data: *mut c_void, event_type: c_int, text: *const c_char)>;

/// Opaque handle handed to the host.
pub struct AnytalkContext {
    inner: Context,
}

/// The raw callback pair. The host promises the callback is safe to invoke
/// from any thread with its user_data pointer.
struct HostCallback {
    cb: unsafe extern "C" fn(*mut c_void, c_int, *const c_char),
    user_data: *mut c_void,
}

unsafe impl Send for HostCallback {}
unsafe impl Sync for HostCallback {}

fn event_code(event: &AsrEvent) -> c_int {
    match event {
        AsrEvent::Partial(_) => ANYTALK_EVENT_PARTIAL,
        AsrEvent::Final(_) => ANYTALK_EVENT_FINAL,
        AsrEvent::Status(_) => ANYTALK_EVENT_STATUS,
        AsrEvent::Error(_) => ANYTALK_EVENT_ERROR,
    }
}

fn event_text(event: &AsrEvent) -> &str {
    match event {
        AsrEvent::Partial(text) | AsrEvent::Final(text) | AsrEvent::Error(text) => text,
        AsrEvent::Status(status) => status.as_str(),
    }
}

/// Owned copy of a C string; None for NULL or non-UTF-8.
unsafe fn cstr_owned(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(str::to_owned)
}

unsafe fn build_config(config: &AnytalkConfig) -> Option<AsrConfig> {
    let app_id = cstr_owned(config.app_id)?;
    let access_token = cstr_owned(config.access_token)?;

    let mut cfg = AsrConfig::new(app_id, access_token);
    if let Some(resource_id) = cstr_owned(config.resource_id) {
        cfg = cfg.with_resource_id(resource_id);
    }
    if let Some(mode) = cstr_owned(config.mode) {
        match Mode::from_str(&mode) {
            Ok(mode) => cfg = cfg.with_mode(mode),
            Err(e) => warn!("{e}; using default mode"),
        }
    }
    Some(cfg)
}

/// # Safety
/// `config` must point to a valid `AnytalkConfig` whose string fields are
/// NUL-terminated or NULL. `callback` must remain callable with
/// `user_data` until `anytalk_destroy` returns.
#[no_mangle]
pub unsafe extern "C" fn anytalk_init(
    config: *const AnytalkConfig,
    callback: AnytalkEventCallback,
    user_data: *mut c_void,
) -> *mut AnytalkContext {
    let Some(cb) = callback else {
        return ptr::null_mut();
    };
    if config.is_null() {
        return ptr::null_mut();
    }
    let Some(cfg) = build_config(&*config) else {
        return ptr::null_mut();
    };

    let host = HostCallback { cb, user_data };
    let sink: EventSink = Arc::new(move |event: AsrEvent| {
        let host = &host;
        let code = event_code(&event);
        // Interior NULs cannot be represented on this ABI; drop the event.
        let Ok(text) = CString::new(event_text(&event)) else {
            return;
        };
        unsafe { (host.cb)(host.user_data, code, text.as_ptr()) }
    });

    let ctx = Context::new(cfg, sink);
    Box::into_raw(Box::new(AnytalkContext { inner: ctx }))
}

/// # Safety
/// `ctx` must be NULL or a pointer returned by `anytalk_init` that has not
/// been destroyed yet.
#[no_mangle]
pub unsafe extern "C" fn anytalk_destroy(ctx: *mut AnytalkContext) {
    if !ctx.is_null() {
        drop(Box::from_raw(ctx));
    }
}

/// # Safety
/// `ctx` as for `anytalk_destroy`.
#[no_mangle]
pub unsafe extern "C" fn anytalk_start(ctx: *mut AnytalkContext) -> c_int {
    let Some(ctx) = ctx.as_ref() else {
        return -1;
    };
    match ctx.inner.start_session() {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// # Safety
/// `ctx` as for `anytalk_destroy`.
#[no_mangle]
pub unsafe extern "C" fn anytalk_stop(ctx: *mut AnytalkContext) -> c_int {
    let Some(ctx) = ctx.as_ref() else {
        return -1;
    };
    ctx.inner.stop_session();
    0
}

/// # Safety
/// `ctx` as for `anytalk_destroy`.
#[no_mangle]
pub unsafe extern "C" fn anytalk_cancel(ctx: *mut AnytalkContext) -> c_int {
    let Some(ctx) = ctx.as_ref() else {
        return -1;
    };
    ctx.inner.cancel();
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use anytalk_foundation::SessionStatus;

    #[test]
    fn event_codes_match_the_header() {
        assert_eq!(event_code(&AsrEvent::Partial("p".into())), 0);
        assert_eq!(event_code(&AsrEvent::Final("f".into())), 1);
        assert_eq!(
            event_code(&AsrEvent::Status(SessionStatus::Recording)),
            2
        );
        assert_eq!(event_code(&AsrEvent::Error("e".into())), 3);
    }

    #[test]
    fn status_events_carry_their_string_form() {
        assert_eq!(event_text(&AsrEvent::Status(SessionStatus::Idle)), "idle");
        assert_eq!(
            event_text(&AsrEvent::Status(SessionStatus::Connecting)),
            "connecting"
        );
    }

    #[test]
    fn config_defaults_apply_for_null_fields() {
        let app = CString::new("app").unwrap();
        let token = CString::new("token").unwrap();
        let raw = AnytalkConfig {
            app_id: app.as_ptr(),
            access_token: token.as_ptr(),
            resource_id: ptr::null(),
            mode: ptr::null(),
        };
        let cfg = unsafe { build_config(&raw) }.unwrap();
        assert_eq!(cfg.app_id, "app");
        assert_eq!(cfg.access_token, "token");
        assert_eq!(cfg.resource_id, "volc.seedasr.sauc.duration");
        assert_eq!(cfg.mode, Mode::BidiAsync);
    }

    #[test]
    fn explicit_mode_and_resource_are_honored() {
        let app = CString::new("app").unwrap();
        let token = CString::new("token").unwrap();
        let resource = CString::new("custom.resource").unwrap();
        let mode = CString::new("nostream").unwrap();
        let raw = AnytalkConfig {
            app_id: app.as_ptr(),
            access_token: token.as_ptr(),
            resource_id: resource.as_ptr(),
            mode: mode.as_ptr(),
        };
        let cfg = unsafe { build_config(&raw) }.unwrap();
        assert_eq!(cfg.resource_id, "custom.resource");
        assert_eq!(cfg.mode, Mode::Nostream);
    }

    #[test]
    fn missing_credentials_reject_the_config() {
        let token = CString::new("token").unwrap();
        let raw = AnytalkConfig {
            app_id: ptr::null(),
            access_token: token.as_ptr(),
            resource_id: ptr::null(),
            mode: ptr::null(),
        };
        assert!(unsafe { build_config(&raw) }.is_none());
    }

    #[test]
    fn control_calls_on_null_context_fail_cleanly() {
        unsafe {
            assert_eq!(anytalk_start(ptr::null_mut()), -1);
            assert_eq!(anytalk_stop(ptr::null_mut()), -1);
            assert_eq!(anytalk_cancel(ptr::null_mut()), -1);
            anytalk_destroy(ptr::null_mut());
        }
    }
}
