use crate::config::Config;
use crate::guard::ActionType;

pub fn validate(config: &Config) -> Result<(), String> {
    if config.max_body_bytes == 0 {
        return Err("max_body_bytes must be > 0".into());
    }
    if config.action_log.capacity == 0 {
        return Err("action_log.capacity must be > 0".into());
    }
    if config.action_log.sweep_interval_secs == 0 {
        return Err("action_log.sweep_interval_secs must be > 0".into());
    }

    let detector = &config.detector;
    if detector.too_fast_actions < 2 {
        return Err("detector.too_fast_actions must be >= 2".into());
    }
    if detector.repetition_actions < 2 {
        return Err("detector.repetition_actions must be >= 2".into());
    }
    let longest = detector.too_fast_actions.max(detector.repetition_actions);
    if longest > config.action_log.capacity {
        return Err(format!(
            "action_log.capacity ({}) must hold at least {longest} records for the detector",
            config.action_log.capacity
        ));
    }
    // HIGH_FREQUENCY needs ceiling + 1 records inside the window.
    let builtin = [
        ActionType::Search,
        ActionType::Contact,
        ActionType::Save,
        ActionType::ProductCreate,
    ]
    .map(|action| (action.as_str().to_string(), detector.ceiling_for(&action)));
    let configured =
        detector.ceilings.iter().map(|(action, c)| (action.as_str().to_string(), *c));
    let fallback = std::iter::once(("default_ceiling".to_string(), detector.default_ceiling));
    if let Some((name, ceiling)) = builtin
        .into_iter()
        .chain(configured)
        .chain(fallback)
        .find(|(_, ceiling)| *ceiling >= config.action_log.capacity)
    {
        return Err(format!(
            "action_log.capacity ({}) must exceed the {name} frequency ceiling ({ceiling})",
            config.action_log.capacity
        ));
    }
    if detector.frequency_window_secs == 0 {
        return Err("detector.frequency_window_secs must be > 0".into());
    }
    if detector.max_events == 0 {
        return Err("detector.max_events must be > 0".into());
    }

    if config.limiter.auto_block_minutes == 0 {
        return Err("limiter.auto_block_minutes must be > 0".into());
    }
    if config.monitor.min_events == 0 {
        return Err("monitor.min_events must be > 0".into());
    }

    if let Some(remote) = &config.remote {
        if remote.url.trim().is_empty() {
            return Err("remote.url cannot be empty".into());
        }
        if !remote.url.starts_with("http://") && !remote.url.starts_with("https://") {
            return Err(format!("remote.url must be an http(s) URL, got {:?}", remote.url));
        }
        if remote.timeout_ms == 0 {
            return Err("remote.timeout_ms must be > 0".into());
        }
    }

    Ok(())
}
