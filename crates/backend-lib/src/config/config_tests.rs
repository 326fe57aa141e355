use super::*;
use figment::Jail;

#[test]
fn test_default_settings_are_valid() {
    let settings = Settings::default();
    assert!(settings.validate().is_ok());
    assert_eq!(settings.session_ttl(), Duration::from_secs(259_200));
    assert!(settings.school("example").is_some());
    assert!(!settings.trust_proxy_headers);
}

#[test]
fn test_settings_validation() {
    let settings = Settings::default();

    let mut invalid = settings.clone();
    invalid.log_level = "loud".to_string();
    assert!(matches!(invalid.validate(), Err(AppError::Config(_))));

    let mut invalid = settings.clone();
    invalid.session_ttl_secs = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.session_ttl_secs = u64::MAX / 2;
    assert!(matches!(invalid.validate(), Err(AppError::Config(_))));

    let mut longest = settings.clone();
    longest.session_ttl_secs = 60 * 60 * 24 * 365;
    assert!(longest.validate().is_ok());

    let mut invalid = settings.clone();
    invalid.rate_limit.max_attempts = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.schools.insert("Bad School!".to_string(), SchoolSettings::default());
    assert!(invalid.validate().is_err());

    let mut invalid = settings;
    invalid.schools.insert(
        "gihs".to_string(),
        SchoolSettings {
            username_prefix: Some(String::new()),
            ..SchoolSettings::default()
        },
    );
    assert!(invalid.validate().is_err());
}

#[test]
fn test_disabled_school_is_hidden() {
    let mut settings = Settings::default();
    settings.schools.insert("gihs".to_string(), SchoolSettings::default());
    assert!(settings.school("gihs").is_none());
    assert!(settings.school("nowhere").is_none());
}

#[test]
fn test_load_from_file_and_env() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "taskcollect.toml",
            r#"
            bind_addr = "0.0.0.0:9000"
            log_level = "debug"
            session_ttl_secs = 3600

            [schools.gihs]
            enabled = true
            username_prefix = "GIHS"
            uppercase_username = true
            timezone = "Australia/Adelaide"
            "#,
        )?;
        jail.set_env("TASKCOLLECT_LOG_LEVEL", "warn");
        jail.set_env("TASKCOLLECT_RATE_LIMIT__MAX_ATTEMPTS", "3");
        jail.set_env("TASKCOLLECT_TRUST_PROXY_HEADERS", "true");

        let settings = Settings::load_from("taskcollect.toml").map_err(|e| e.to_string())?;
        assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(settings.log_level, "warn"); // environment takes precedence
        assert_eq!(settings.session_ttl_secs, 3600);
        assert_eq!(settings.rate_limit.max_attempts, 3);
        assert_eq!(settings.rate_limit.lockout_secs, 300);
        assert!(settings.trust_proxy_headers);

        let gihs = settings.school("gihs").ok_or("gihs not loaded")?;
        assert_eq!(gihs.username_prefix.as_deref(), Some("GIHS"));
        assert!(gihs.uppercase_username);
        // defaults survive a file that does not mention them
        assert!(settings.school("example").is_some());
        Ok(())
    });
}

#[test]
fn test_missing_file_uses_defaults() {
    Jail::expect_with(|_| {
        let settings = Settings::load_from("absent.toml").map_err(|e| e.to_string())?;
        assert_eq!(settings, Settings::default());
        Ok(())
    });
}

#[test]
fn test_invalid_file_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("bad.toml", "session_ttl_secs = 0")?;
        assert!(Settings::load_from("bad.toml").is_err());

        jail.create_file("forever.toml", "session_ttl_secs = 9223372036854775807")?;
        assert!(Settings::load_from("forever.toml").is_err());
        Ok(())
    });
}
