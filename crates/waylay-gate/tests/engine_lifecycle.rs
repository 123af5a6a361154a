//! End-to-end lifecycle: privileged load installs the safety net and the
//! wildcard modules, package load activates per-package modules, and
//! intercepted calls routed through the registry behave per contract.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use waylay_gate::{Engine, EngineConfig, ModuleCatalog, ModuleKind, Preferences, ALLOW_HOOK_KEY};
use waylay_host::{CallFrame, HostClass, HostMember, HostModel, ObjectHandle};
use waylay_safety::{CrashObserver, CrashPolicy, SettingsStore};
use waylay_types::{CrashRecord, DeviceClass, Environment};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ----------------------------------------------------------------------
// Collaborator doubles
// ----------------------------------------------------------------------

#[derive(Default)]
struct Recorder {
    crashes: Mutex<Vec<CrashRecord>>,
    policy_calls: Mutex<Vec<(String, i64)>>,
    ints: Mutex<HashMap<String, i64>>,
    approve: Mutex<bool>,
}

impl CrashObserver for Recorder {
    fn on_crash(&self, record: &CrashRecord) {
        self.crashes.lock().push(record.clone());
    }
}

impl CrashPolicy for Recorder {
    fn on_handle_crash(
        &self,
        _context: Option<ObjectHandle>,
        target: &str,
        mitigation_count: i64,
    ) -> bool {
        self.policy_calls
            .lock()
            .push((target.to_string(), mitigation_count));
        *self.approve.lock()
    }
}

impl SettingsStore for Recorder {
    fn put_int(&self, key: &str, value: i64) {
        self.ints.lock().insert(key.to_string(), value);
    }
    fn set_property(&self, _key: &str, _value: &str) {}
    fn get_flag(&self, _key: &str) -> bool {
        false
    }
}

// ----------------------------------------------------------------------
// Host fixture
// ----------------------------------------------------------------------

struct Host {
    model: Arc<HostModel>,
    set_level: Arc<HostMember>,
    step: Arc<HostMember>,
    crash_entry: Arc<HostMember>,
    escalations: Arc<Mutex<u32>>,
}

fn privileged_host() -> Host {
    let model = Arc::new(HostModel::new());
    let escalations = Arc::new(Mutex::new(0u32));

    let mut watchdog = HostClass::new("PackageWatchdog", None);
    let set_level = {
        let escalations = Arc::clone(&escalations);
        watchdog.add_method(
            "setMitigationLevel",
            &["int", "package", "context"],
            "boolean",
            Arc::new(move |_frame| {
                *escalations.lock() += 1;
                Ok(json!(true))
            }),
        )
    };
    let step = watchdog.add_method(
        "doMitigationStep",
        &["int", "package", "context"],
        "boolean",
        Arc::new(|_frame| Ok(json!(true))),
    );
    watchdog.add_method(
        "removeMessage",
        &["int", "package"],
        "void",
        Arc::new(|_frame| Ok(Value::Null)),
    );
    model.register_class(watchdog);

    let mut app_errors = HostClass::new("AppErrors", None);
    let crash_entry = app_errors.add_method(
        "handleApplicationCrash",
        &["process", "crash-info", "int", "text", "text"],
        "boolean",
        Arc::new(|_frame| Ok(json!(true))),
    );
    model.register_class(app_errors);

    let mut verifier = HostClass::new("SignatureVerifier", None);
    verifier.add_method(
        "verifySignatures",
        &["package", "package", "boolean"],
        "boolean",
        Arc::new(|_frame| Ok(json!(false))),
    );
    model.register_class(verifier);

    Host {
        model,
        set_level,
        step,
        crash_entry,
        escalations,
    }
}

fn engine_with(recorder: &Arc<Recorder>, prefs: &Preferences) -> Engine {
    Engine::new(
        EngineConfig {
            env: Environment {
                sdk_version: 35,
                os_version: 2.0,
                device_class: DeviceClass::Phone,
            },
            helper_package: "waylay.rescue".to_string(),
            observer: Arc::clone(recorder) as Arc<dyn CrashObserver>,
            policy: Arc::clone(recorder) as Arc<dyn CrashPolicy>,
            settings: Arc::clone(recorder) as Arc<dyn SettingsStore>,
        },
        ModuleCatalog::builtin(),
        prefs.clone(),
    )
}

fn enabled_prefs() -> Preferences {
    let prefs = Preferences::new();
    prefs.set(ALLOW_HOOK_KEY, json!(true));
    prefs
}

const WATCHDOG: ObjectHandle = ObjectHandle(1);

#[test]
fn privileged_load_installs_safety_net_and_wildcard_modules() {
    init_logging();
    let recorder = Arc::new(Recorder::default());
    *recorder.approve.lock() = true;
    let prefs = enabled_prefs();
    let engine = engine_with(&recorder, &prefs);
    let host = privileged_host();

    let report = engine.on_privileged_load(&host.model);
    assert_eq!(report.activated, vec![ModuleKind::FrameworkPatch]);
    assert!(report.failures.is_empty());

    // Escalation for system-ui, count 3, policy approves: suppressed.
    let result = engine
        .registry()
        .dispatch(
            &host.set_level,
            CallFrame::new(Some(WATCHDOG), vec![json!(3), json!("system-ui"), json!(9)]),
        )
        .unwrap();
    assert_eq!(result, json!(true));
    assert_eq!(*host.escalations.lock(), 0);
    assert_eq!(recorder.ints.lock()["sys.rescueparty.systemui.level"], 0);
    assert_eq!(recorder.ints.lock()["sys.anr.rescue.systemui.level"], 0);
    assert_eq!(
        engine.field_store().get_str(WATCHDOG, "flag").as_deref(),
        Some("system-ui")
    );
    assert_eq!(recorder.policy_calls.lock()[0], ("system-ui".to_string(), 3));

    // The follow-up mitigation step completes and clears the tag.
    let result = engine
        .registry()
        .dispatch(
            &host.step,
            CallFrame::new(Some(WATCHDOG), vec![json!(3), json!("system-ui"), json!(9)]),
        )
        .unwrap();
    assert_eq!(result, json!(true));
    assert!(engine.field_store().get(WATCHDOG, "flag").is_none());

    // Crash interception forwards the record, disposition untouched.
    let result = engine
        .registry()
        .dispatch(
            &host.crash_entry,
            CallFrame::new(
                None,
                vec![
                    json!({"pid": 77}),
                    json!({
                        "exception_class": "NullPointerException",
                        "file": "StatusBar",
                        "line": 12,
                        "method": "refresh",
                    }),
                    json!(0),
                    json!("status bar crashed"),
                    json!("at StatusBar.refresh"),
                ],
            ),
        )
        .unwrap();
    assert_eq!(result, json!(true));
    let crashes = recorder.crashes.lock();
    assert_eq!(crashes.len(), 1);
    assert_eq!(crashes[0].exception_class, "NullPointerException");
    assert_eq!(crashes[0].message, "status bar crashed");
}

#[test]
fn disabled_guard_leaves_the_host_untouched() {
    init_logging();
    let recorder = Arc::new(Recorder::default());
    let prefs = Preferences::new(); // allow_hook unset
    let engine = engine_with(&recorder, &prefs);
    let host = privileged_host();

    let report = engine.on_privileged_load(&host.model);
    assert!(report.is_empty());

    // No safety net: the original escalation runs.
    engine
        .registry()
        .dispatch(
            &host.set_level,
            CallFrame::new(Some(WATCHDOG), vec![json!(3), json!("system-ui"), json!(9)]),
        )
        .unwrap();
    assert_eq!(*host.escalations.lock(), 1);
    assert!(recorder.policy_calls.lock().is_empty());
}

#[test]
fn framework_patch_toggle_takes_effect_through_the_registry() {
    init_logging();
    let recorder = Arc::new(Recorder::default());
    let prefs = enabled_prefs();
    let engine = engine_with(&recorder, &prefs);
    let host = privileged_host();
    engine.on_privileged_load(&host.model);

    let verify = host
        .model
        .class("SignatureVerifier")
        .unwrap()
        .declared_methods_named("verifySignatures")
        .remove(0);

    let args = || vec![json!(null), json!(null), json!(false)];
    let result = engine
        .registry()
        .dispatch(&verify, CallFrame::new(None, args()))
        .unwrap();
    assert_eq!(result, json!(false));

    prefs.set("framework_skip_signature_check", json!(true));
    let result = engine
        .registry()
        .dispatch(&verify, CallFrame::new(None, args()))
        .unwrap();
    assert_eq!(result, json!(true));
}

#[test]
fn package_load_activates_targeted_module() {
    init_logging();
    let recorder = Arc::new(Recorder::default());
    let prefs = enabled_prefs();
    let engine = engine_with(&recorder, &prefs);

    let model = Arc::new(HostModel::new());
    let mut throttler = HostClass::new("NotificationThrottler", None);
    let should_throttle = throttler.add_method(
        "shouldThrottle",
        &["text"],
        "boolean",
        Arc::new(|_frame| Ok(json!(true))),
    );
    model.register_class(throttler);

    let report = engine.on_package_load("system-ui", &model);
    assert_eq!(report.activated, vec![ModuleKind::SystemUiTweaks]);
    assert!(!report.fallback);

    // Gated hook: inert until the preference flips.
    let result = engine
        .registry()
        .dispatch(&should_throttle, CallFrame::new(None, vec![json!("chat")]))
        .unwrap();
    assert_eq!(result, json!(true));

    prefs.set("systemui_disable_notification_throttle", json!(true));
    let result = engine
        .registry()
        .dispatch(&should_throttle, CallFrame::new(None, vec![json!("chat")]))
        .unwrap();
    assert_eq!(result, json!(false));
}

#[test]
fn unknown_package_routes_to_fallback_and_denied_package_to_nothing() {
    init_logging();
    let recorder = Arc::new(Recorder::default());
    let prefs = enabled_prefs();
    let engine = engine_with(&recorder, &prefs);
    let model = Arc::new(HostModel::new());

    let report = engine.on_package_load("com.example.mail", &model);
    assert!(report.fallback);
    assert_eq!(report.activated, vec![ModuleKind::ThirdAppFallback]);

    let report = engine.on_package_load("webview", &model);
    assert!(report.is_empty());
}
