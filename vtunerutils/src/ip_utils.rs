use std::net::{IpAddr, UdpSocket};

/// Guesses the local IP address of the machine.
///
/// Binds a UDP socket and "connects" it to a public DNS server; UDP being
/// connectionless nothing is sent, but the OS picks the interface it would
/// route through, which gives us the LAN address.
///
/// Returns `"127.0.0.1"` when any step fails.
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

/// Returns the host that clients on the network should use to reach a
/// server listening on `listen_address`.
///
/// Wildcard addresses (`0.0.0.0`, `::`) or an empty string are replaced by
/// [`guess_local_ip`]; anything else is returned unchanged.
pub fn advertise_host(listen_address: &str) -> String {
    let trimmed = listen_address.trim();
    if trimmed.is_empty() {
        return guess_local_ip();
    }
    match trimmed.parse::<IpAddr>() {
        Ok(ip) if ip.is_unspecified() => guess_local_ip(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_local_ip_returns_valid_ip() {
        let ip = guess_local_ip();
        assert!(ip.parse::<IpAddr>().is_ok(), "Should return a valid IP address");
    }

    #[test]
    fn test_advertise_host_keeps_explicit_address() {
        assert_eq!(advertise_host("192.168.1.20"), "192.168.1.20");
        assert_eq!(advertise_host("tuner.lan"), "tuner.lan");
    }

    #[test]
    fn test_advertise_host_replaces_wildcards() {
        for wildcard in ["0.0.0.0", "::", "", "  "] {
            let host = advertise_host(wildcard);
            let ip: IpAddr = host.parse().unwrap();
            assert!(!ip.is_unspecified(), "{wildcard:?} resolved to {host}");
        }
    }
}
