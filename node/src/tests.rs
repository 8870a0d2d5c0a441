use super::*;

const MINIMAL: &str = "engine_path: /usr/bin/stockfish\n";

fn parse(yaml: &str) -> Config {
    serde_yaml::from_str(yaml).expect("valid yaml")
}

#[test]
fn config_defaults() {
    let config = parse(MINIMAL).validate().expect("valid config");
    assert!(config.account.is_none());
    assert_eq!(config.server_url.as_str(), defaults::DEFAULT_SERVER_URL);
    assert_eq!(config.login_url.as_str(), defaults::DEFAULT_LOGIN_URL);
    assert_eq!(config.lobby_url.as_str(), defaults::DEFAULT_LOBBY_URL);
    assert_eq!(config.origin, defaults::DEFAULT_ORIGIN);
    assert_eq!(config.policy, Policy::default());
    assert_eq!(config.log_level, Level::INFO);
    assert_eq!(config.mailbox_size, defaults::DEFAULT_MAILBOX_SIZE);
    assert!(config.dashboard_port.is_none());
    assert!(config.engine_options.is_empty());
}

#[test]
fn config_full() {
    let config = parse(
        r#"
account:
  login: bot
  password: hunter2
engine_path: /opt/engine
engine_depth: 14
engine_options:
  Threads: 2
  Ponder: false
  Style: Aggressive
auto_start: true
kick_low_elo: true
kick_if_lose: true
dashboard_port: 8080
log_level: debug
mailbox_size: 64
"#,
    )
    .validate()
    .expect("valid config");

    assert_eq!(config.account.as_ref().map(|a| a.login.as_str()), Some("bot"));
    assert_eq!(
        config.policy,
        Policy {
            auto_start: true,
            kick_low_elo: true,
            kick_if_lose: true,
            kick_if_draw: false,
            engine_depth: 14,
        }
    );
    assert_eq!(config.engine_options["Threads"], "2");
    assert_eq!(config.engine_options["Ponder"], "false");
    assert_eq!(config.engine_options["Style"], "Aggressive");
    assert_eq!(config.dashboard_port, Some(8080));
    assert_eq!(config.log_level, Level::DEBUG);
    assert_eq!(config.mailbox_size, 64);
}

#[test]
fn config_redacted_debug_does_not_leak_secrets() {
    let config = parse("account:\n  login: bot\n  password: hunter2\nengine_path: /e\n");
    let rendered = format!("{:?}", config.redacted_debug());
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("bot"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn config_rejects_bad_depth() {
    for depth in [0, MAX_ENGINE_DEPTH + 1] {
        let err = parse(&format!("engine_path: /e\nengine_depth: {depth}\n"))
            .validate()
            .err()
            .expect("invalid depth");
        assert!(matches!(err, ConfigError::InvalidEngineDepth { .. }));
    }
}

#[test]
fn config_rejects_bad_log_level() {
    let err = parse("engine_path: /e\nlog_level: loud\n")
        .validate()
        .err()
        .expect("invalid log level");
    assert!(matches!(err, ConfigError::InvalidLogLevel { .. }));
}

#[test]
fn config_rejects_wrong_url_scheme() {
    let err = parse("engine_path: /e\nserver_url: https://example.com/ws/\n")
        .validate()
        .err()
        .expect("invalid scheme");
    assert!(matches!(
        err,
        ConfigError::InvalidUrlScheme {
            field: "server_url",
            ..
        }
    ));

    let err = parse("engine_path: /e\nlogin_url: not a url\n")
        .validate()
        .err()
        .expect("invalid url");
    assert!(matches!(err, ConfigError::InvalidUrl { field: "login_url", .. }));
}

#[test]
fn config_rejects_empty_credentials() {
    let err = parse("account:\n  login: bot\n  password: ''\nengine_path: /e\n")
        .validate()
        .err()
        .expect("empty password");
    assert!(matches!(
        err,
        ConfigError::EmptyCredential { field: "password" }
    ));
}

#[test]
fn config_rejects_zero_mailbox() {
    let err = parse("engine_path: /e\nmailbox_size: 0\n")
        .validate()
        .err()
        .expect("zero mailbox");
    assert!(matches!(
        err,
        ConfigError::InvalidNonZero {
            field: "mailbox_size",
            ..
        }
    ));
}

#[test]
fn config_rejects_nested_engine_option() {
    let err = parse("engine_path: /e\nengine_options:\n  Book: [a, b]\n")
        .validate()
        .err()
        .expect("invalid option");
    assert!(matches!(err, ConfigError::InvalidEngineOption { name } if name == "Book"));
}

#[test]
fn config_requires_engine_path() {
    assert!(serde_yaml::from_str::<Config>("auto_start: true\n").is_err());
}
