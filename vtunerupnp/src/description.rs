//! Description UPnP du root device

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::ssdp::MEDIA_SERVER_DEVICE_TYPE;

const DEVICE_NAMESPACE: &str = "urn:schemas-upnp-org:device-1-0";

/// Champs du document `/device.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    /// URL de base (ex: "http://192.168.1.20:6077")
    pub url_base: String,
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_name: String,
    pub model_number: String,
    pub serial_number: String,
    /// UDN complet, préfixe "uuid:" inclus
    pub udn: String,
}

impl DeviceDescription {
    /// Description d'un MediaServer dont l'UDN dérive de `uuid`
    pub fn media_server(uuid: &str) -> Self {
        let uuid = uuid.strip_prefix("uuid:").unwrap_or(uuid);
        Self {
            url_base: String::new(),
            device_type: MEDIA_SERVER_DEVICE_TYPE.to_string(),
            friendly_name: String::new(),
            manufacturer: String::new(),
            model_name: String::new(),
            model_number: String::new(),
            serial_number: String::new(),
            udn: format!("uuid:{}", uuid),
        }
    }

    /// Construit l'élément `<root>` de la description
    pub fn description_element(&self) -> Element {
        let mut root = Element::new("root");
        root.attributes
            .insert("xmlns".to_string(), DEVICE_NAMESPACE.to_string());

        let mut spec = Element::new("specVersion");
        spec.children.push(XMLNode::Element(text_element("major", "1")));
        spec.children.push(XMLNode::Element(text_element("minor", "0")));
        root.children.push(XMLNode::Element(spec));

        root.children
            .push(XMLNode::Element(text_element("URLBase", &self.url_base)));

        let mut device = Element::new("device");
        for (name, value) in [
            ("deviceType", &self.device_type),
            ("friendlyName", &self.friendly_name),
            ("manufacturer", &self.manufacturer),
            ("modelName", &self.model_name),
            ("modelNumber", &self.model_number),
            ("serialNumber", &self.serial_number),
            ("UDN", &self.udn),
        ] {
            device.children.push(XMLNode::Element(text_element(name, value)));
        }
        root.children.push(XMLNode::Element(device));

        root
    }
}

fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

/// Sérialise la description avec l'en-tête XML
pub fn render_description(description: &DeviceDescription) -> Result<String, xmltree::Error> {
    let config = EmitterConfig::new()
        .perform_indent(true)
        .indent_string("  ")
        .write_document_declaration(false);

    let mut xml_output = Vec::new();
    description
        .description_element()
        .write_with_config(&mut xml_output, config)?;

    let mut xml = String::from_utf8_lossy(&xml_output).to_string();
    xml.insert_str(0, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description() -> DeviceDescription {
        DeviceDescription {
            url_base: "http://10.0.0.2:6077".into(),
            friendly_name: "vtuner".into(),
            manufacturer: "Silicondust".into(),
            model_name: "HDTC-2US".into(),
            model_number: "HDTC-2US".into(),
            serial_number: "12345678".into(),
            ..DeviceDescription::media_server("uuid:abcd")
        }
    }

    #[test]
    fn test_render_has_single_header() {
        let xml = render_description(&description()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root"));
        assert_eq!(xml.matches("<?xml").count(), 1);
    }

    #[test]
    fn test_render_round_trips_fields() {
        let xml = render_description(&description()).unwrap();
        let root = Element::parse(xml.as_bytes()).unwrap();

        assert_eq!(root.name, "root");
        assert!(xml.contains(&format!("xmlns=\"{}\"", DEVICE_NAMESPACE)));

        let spec = root.get_child("specVersion").unwrap();
        assert_eq!(spec.get_child("major").unwrap().get_text().unwrap(), "1");

        let device = root.get_child("device").unwrap();
        let text = |name: &str| device.get_child(name).unwrap().get_text().unwrap().to_string();
        assert_eq!(text("deviceType"), MEDIA_SERVER_DEVICE_TYPE);
        assert_eq!(text("friendlyName"), "vtuner");
        assert_eq!(text("UDN"), "uuid:abcd");
        assert_eq!(
            root.get_child("URLBase").unwrap().get_text().unwrap(),
            "http://10.0.0.2:6077"
        );
    }
}
