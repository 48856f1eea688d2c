use request_identity::{ConfigError, IpAddressDetector, ProxyTable, ResolvedClientIp, detect_client_ip};

fn proxies(pairs: &[(&str, &str)]) -> ProxyTable {
    ProxyTable::from_pairs(pairs.iter().copied()).expect("valid proxy table")
}

/// Header lookup returning `value` for `name` only
fn only(name: &'static str, value: &'static str) -> impl Fn(&str) -> Option<String> {
    move |header| (header == name).then(|| value.to_string())
}

fn none(_: &str) -> Option<String> {
    None
}

#[test]
fn test_no_proxies_returns_peer() {
    assert_eq!(detect_client_ip("203.0.113.5", &ProxyTable::new(), none), "203.0.113.5");
    assert_eq!(
        detect_client_ip(
            "192.168.1.100",
            &ProxyTable::new(),
            only("X-Forwarded-For", "198.51.100.1")
        ),
        "192.168.1.100"
    );
}

#[test]
fn test_invalid_peer_is_unspecified() {
    assert_eq!(detect_client_ip("not-an-ip", &ProxyTable::new(), none), "0.0.0.0");
    assert_eq!(detect_client_ip("", &ProxyTable::new(), none), "0.0.0.0");

    let detector = IpAddressDetector::new(proxies(&[("0.0.0.0/0", "X-Forwarded-For")]));
    assert_eq!(
        detector.detect_resolved("10.0.0.1:8080", only("X-Forwarded-For", "203.0.113.5")),
        ResolvedClientIp::Unspecified
    );
}

#[test]
fn test_trusted_proxy_exact_match() {
    let table = proxies(&[("192.168.1.1", "X-Forwarded-For")]);
    assert_eq!(
        detect_client_ip("192.168.1.1", &table, only("X-Forwarded-For", "203.0.113.5")),
        "203.0.113.5"
    );
    assert_eq!(
        detect_client_ip("192.168.1.100", &table, only("X-Forwarded-For", "203.0.113.5")),
        "192.168.1.100"
    );
}

#[test]
fn test_trusted_proxy_subnet() {
    let table = proxies(&[("192.168.1.0/24", "X-Forwarded-For")]);
    assert_eq!(
        detect_client_ip("192.168.1.50", &table, only("X-Forwarded-For", "203.0.113.5")),
        "203.0.113.5"
    );
    assert_eq!(
        detect_client_ip("192.168.2.50", &table, only("X-Forwarded-For", "203.0.113.5")),
        "192.168.2.50"
    );
}

#[test]
fn test_subnet_prefix_lengths() {
    let lookup = || only("X-Forwarded-For", "203.0.113.5");

    let table = proxies(&[("10.0.0.0/8", "X-Forwarded-For")]);
    assert_eq!(detect_client_ip("10.255.1.2", &table, lookup()), "203.0.113.5");
    assert_eq!(detect_client_ip("11.0.0.1", &table, lookup()), "11.0.0.1");

    let table = proxies(&[("172.16.0.0/16", "X-Forwarded-For")]);
    assert_eq!(detect_client_ip("172.16.200.1", &table, lookup()), "203.0.113.5");
    assert_eq!(detect_client_ip("172.17.0.1", &table, lookup()), "172.17.0.1");

    let table = proxies(&[("10.0.1.200/32", "X-Forwarded-For")]);
    assert_eq!(detect_client_ip("10.0.1.200", &table, lookup()), "203.0.113.5");
    assert_eq!(detect_client_ip("10.0.1.201", &table, lookup()), "10.0.1.201");
}

#[test]
fn test_only_first_forwarded_address_is_used() {
    let table = proxies(&[("192.168.1.1", "X-Forwarded-For")]);
    assert_eq!(
        detect_client_ip(
            "192.168.1.1",
            &table,
            only("X-Forwarded-For", "203.0.113.5, 198.51.100.1, 192.0.2.1")
        ),
        "203.0.113.5"
    );
    assert_eq!(
        detect_client_ip("192.168.1.1", &table, only("X-Forwarded-For", "  203.0.113.9  ")),
        "203.0.113.9"
    );
}

#[test]
fn test_malformed_forwarded_value_keeps_peer() {
    let table = proxies(&[("192.168.1.1", "X-Forwarded-For")]);

    assert_eq!(
        detect_client_ip("192.168.1.1", &table, only("X-Forwarded-For", "invalid-ip")),
        "192.168.1.1"
    );
    assert_eq!(
        detect_client_ip("192.168.1.1", &table, only("X-Forwarded-For", "invalid-ip, 203.0.113.5")),
        "192.168.1.1"
    );
    assert_eq!(
        detect_client_ip("192.168.1.1", &table, only("X-Forwarded-For", "")),
        "192.168.1.1"
    );
}

#[test]
fn test_missing_header_keeps_peer() {
    let table = proxies(&[("192.168.1.1", "X-Forwarded-For")]);
    assert_eq!(detect_client_ip("192.168.1.1", &table, none), "192.168.1.1");
    assert_eq!(
        detect_client_ip("192.168.1.1", &table, only("X-Real-IP", "203.0.113.5")),
        "192.168.1.1"
    );
}

#[test]
fn test_ipv6_addresses() {
    let peer = "2001:0db8:85a3:0000:0000:8a2e:0370:7334";
    assert_eq!(detect_client_ip(peer, &ProxyTable::new(), none), peer);

    let table = proxies(&[("2001:0db8:85a3::/64", "X-Forwarded-For")]);
    assert_eq!(
        detect_client_ip(peer, &table, only("X-Forwarded-For", "2001:0db8:1234::1")),
        "2001:0db8:1234::1"
    );

    let outside = "2001:0db8:1234:0000:0000:0000:0000:0001";
    assert_eq!(
        detect_client_ip(outside, &table, only("X-Forwarded-For", "2001:0db8:5678::1")),
        outside
    );
}

#[test]
fn test_mixed_families_in_one_table() {
    let table = proxies(&[
        ("2001:0db8:85a3::/64", "X-Real-IP"),
        ("192.168.1.0/24", "X-Forwarded-For"),
    ]);
    assert_eq!(
        detect_client_ip("192.168.1.50", &table, only("X-Forwarded-For", "203.0.113.5")),
        "203.0.113.5"
    );
    assert_eq!(
        detect_client_ip(
            "2001:db8:85a3::9",
            &table,
            only("X-Real-IP", "198.51.100.20")
        ),
        "198.51.100.20"
    );
}

#[test]
fn test_multiple_trusted_proxies() {
    let table = proxies(&[
        ("192.168.1.1", "X-Forwarded-For"),
        ("10.0.0.0/8", "X-Real-IP"),
    ]);
    assert_eq!(
        detect_client_ip("10.1.2.3", &table, only("X-Real-IP", "203.0.113.77")),
        "203.0.113.77"
    );
    assert_eq!(
        detect_client_ip("10.1.2.3", &table, only("X-Forwarded-For", "203.0.113.77")),
        "10.1.2.3"
    );
}

#[test]
fn test_forwarded_address_is_returned_as_sent() {
    let detector = IpAddressDetector::new(proxies(&[("127.0.0.1", "X-Forwarded-For")]));

    let resolved = detector.detect_resolved("127.0.0.1", only("X-Forwarded-For", "2001:0DB8::0001"));
    assert_eq!(resolved.ip(), "2001:0DB8::0001");
    assert_eq!(resolved.source(), "forwarded");
}

#[test]
fn test_keyless_proxy_configuration_is_rejected() {
    assert!(matches!(
        ProxyTable::parse(r#"["192.168.1.1"]"#),
        Err(ConfigError::InvalidProxyTable(_))
    ));
    assert!(matches!(
        ProxyTable::parse("192.168.1.1"),
        Err(ConfigError::InvalidProxyTable(_))
    ));
}
