use std::collections::BTreeMap;

use vserve_backend::ParamValue;
use vserve_common::ServeError;
use vserve_core::sampling::{defaults, resolve};
use vserve_core::MaxTokens;

fn tokens(n: i64) -> MaxTokens {
    MaxTokens::try_from(n).unwrap()
}

fn overrides(pairs: &[(&str, ParamValue)]) -> BTreeMap<String, ParamValue> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn defaults_plus_request_max_tokens() {
    let cfg = resolve(None, MaxTokens::default(), None).unwrap();
    assert_eq!(cfg.get("temperature"), Some(&ParamValue::Float(0.8)));
    assert_eq!(cfg.get("repetition_penalty"), Some(&ParamValue::Float(1.0)));
    assert_eq!(cfg.get("top_p"), Some(&ParamValue::Float(1.0)));
    assert_eq!(cfg.max_tokens(), Some(400));
    assert_eq!(cfg.len(), 4);
}

#[test]
fn empty_override_map_changes_nothing() {
    let empty = BTreeMap::new();
    let cfg = resolve(Some(&empty), tokens(64), None).unwrap();
    let mut expected = defaults();
    expected.insert("max_tokens", 64_i64);
    assert_eq!(cfg, expected);
}

#[test]
fn caller_values_win_for_every_key() {
    let o = overrides(&[
        ("temperature", ParamValue::Float(0.1)),
        ("top_p", ParamValue::Float(0.9)),
        ("seed", ParamValue::Int(7)),
        ("stop", ParamValue::Text("\n".into())),
        ("ignore_eos", ParamValue::Bool(true)),
    ]);
    let cfg = resolve(Some(&o), tokens(100), None).unwrap();
    for (k, v) in &o {
        assert_eq!(cfg.get(k), Some(v), "key {k}");
    }
    assert_eq!(cfg.get("repetition_penalty"), Some(&ParamValue::Float(1.0)));
    assert_eq!(cfg.max_tokens(), Some(100));
}

#[test]
fn max_tokens_override_is_never_replaced() {
    let o = overrides(&[("max_tokens", ParamValue::Int(5000))]);
    let cfg = resolve(Some(&o), tokens(20), None).unwrap();
    assert_eq!(cfg.max_tokens(), Some(5000));
}

#[test]
fn unknown_keys_pass_through_without_a_contract() {
    let o = overrides(&[("made_up", ParamValue::Int(1))]);
    let cfg = resolve(Some(&o), tokens(20), None).unwrap();
    assert_eq!(cfg.get("made_up"), Some(&ParamValue::Int(1)));
}

#[test]
fn unknown_keys_are_rejected_when_engine_publishes_its_contract() {
    let accepted = vec!["temperature".to_string(), "max_tokens".to_string()];
    let ok = overrides(&[("temperature", ParamValue::Float(0.2))]);
    assert!(resolve(Some(&ok), tokens(20), Some(&accepted)).is_ok());

    let bad = overrides(&[("temperature", ParamValue::Float(0.2)), ("beam_width", ParamValue::Int(4))]);
    match resolve(Some(&bad), tokens(20), Some(&accepted)).unwrap_err() {
        ServeError::InvalidRequest(msg) => assert!(msg.contains("beam_width")),
        other => panic!("unexpected error: {other:?}"),
    }
}
