//! Construction et analyse des messages SSDP

use super::{MAX_AGE, SSDP_MULTICAST_ADDR, SSDP_PORT, SsdpDevice};

/// NOTIFY ssdp:alive pour un type de notification
pub fn alive_message(device: &SsdpDevice, nt: &str) -> String {
    format!(
        "NOTIFY * HTTP/1.1\r\n\
         HOST: {}:{}\r\n\
         CACHE-CONTROL: max-age={}\r\n\
         LOCATION: {}\r\n\
         NT: {}\r\n\
         NTS: ssdp:alive\r\n\
         SERVER: {}\r\n\
         USN: {}\r\n\
         \r\n",
        SSDP_MULTICAST_ADDR,
        SSDP_PORT,
        MAX_AGE,
        device.location,
        nt,
        device.server,
        device.usn(nt)
    )
}

/// NOTIFY ssdp:byebye pour un type de notification
pub fn byebye_message(device: &SsdpDevice, nt: &str) -> String {
    format!(
        "NOTIFY * HTTP/1.1\r\n\
         HOST: {}:{}\r\n\
         NT: {}\r\n\
         NTS: ssdp:byebye\r\n\
         USN: {}\r\n\
         \r\n",
        SSDP_MULTICAST_ADDR,
        SSDP_PORT,
        nt,
        device.usn(nt)
    )
}

/// Réponse unicast à un M-SEARCH
pub fn msearch_response(device: &SsdpDevice, st: &str) -> String {
    let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    format!(
        "HTTP/1.1 200 OK\r\n\
         CACHE-CONTROL: max-age={}\r\n\
         DATE: {}\r\n\
         EXT:\r\n\
         LOCATION: {}\r\n\
         SERVER: {}\r\n\
         ST: {}\r\n\
         USN: {}\r\n\
         \r\n",
        MAX_AGE,
        date,
        device.location,
        device.server,
        st,
        device.usn(st)
    )
}

/// Extrait le champ ST d'un M-SEARCH
///
/// Retourne `None` si le message n'est pas un M-SEARCH ou n'a pas de ST.
pub fn parse_st(data: &str) -> Option<String> {
    let mut lines = data.lines();
    if !lines.next()?.to_uppercase().starts_with("M-SEARCH") {
        return None;
    }
    lines.find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("ST")
            .then(|| value.trim().to_string())
    })
}

/// Cibles à annoncer en réponse à un ST donné
pub fn matching_targets(device: &SsdpDevice, st: &str) -> Vec<String> {
    let targets = device.search_targets();
    if st == "ssdp:all" {
        targets
    } else if targets.iter().any(|t| t == st) {
        vec![st.to_string()]
    } else {
        Vec::new()
    }
}
