use msgbox::{Address, AddressError, Protocol};

#[test]
fn valid_addresses_round_trip() {
    let cases = [
        ("tcp://127.0.0.1:80", Protocol::Tcp, "127.0.0.1", 80),
        ("udp://*:2468", Protocol::Udp, "*", 2468),
        ("udp://255.255.255.255:65535", Protocol::Udp, "255.255.255.255", 65535),
        ("tcp://10.0.0.1:0", Protocol::Tcp, "10.0.0.1", 0),
    ];

    for (text, protocol, ip, port) in cases {
        let address = Address::parse(text).expect(text);
        assert_eq!(address.protocol(), protocol, "{text}");
        assert_eq!(address.ip(), ip, "{text}");
        assert_eq!(address.port(), port, "{text}");
        assert_eq!(address.to_string(), text);
    }
}

#[test]
fn unrecognized_prefix_is_named() {
    let err = Address::parse("foo://1.2.3.4:80").unwrap_err();
    assert_eq!(err, AddressError::UnrecognizedPrefix("foo://1.2.3.4:80".into()));
    assert!(err.to_string().contains("unrecognized prefix"));
}

#[test]
fn each_grammar_rule_is_enforced() {
    assert!(matches!(
        Address::parse("tcp://1.2.3.4"),
        Err(AddressError::MissingColon(_))
    ));
    assert!(matches!(
        Address::parse("tcp://:80"),
        Err(AddressError::IpLength { len: 0, .. })
    ));
    assert!(matches!(
        Address::parse("udp://1234.1234.1234.1:80"),
        Err(AddressError::IpLength { len: 16, .. })
    ));
    assert!(matches!(
        Address::parse("udp://1.2.3.4:"),
        Err(AddressError::EmptyPort(_))
    ));
    assert!(matches!(
        Address::parse("udp://1.2.3.4:80x"),
        Err(AddressError::InvalidPort(_))
    ));
    assert!(matches!(
        Address::parse("udp://1.2.3.4:+80"),
        Err(AddressError::InvalidPort(_))
    ));
    assert!(matches!(
        Address::parse("udp://1.2.3.4:70000"),
        Err(AddressError::InvalidPort(_))
    ));
    assert!(matches!(
        Address::parse("udp://localhost:80"),
        Err(AddressError::InvalidIp { .. })
    ));
    assert!(matches!(
        Address::parse("TCP://1.2.3.4:80"),
        Err(AddressError::UnrecognizedPrefix(_))
    ));
}

#[test]
fn errors_have_messages() {
    for bad in ["", "tcp://", "udp://1.2.3.4", "udp://1.2.3.4:", "udp://1.2.3.4:p"] {
        let err = Address::parse(bad).unwrap_err();
        assert!(!err.to_string().is_empty(), "{bad}");
    }
}
