//! XMLTV document model
//!
//! Only the parts of the format the tuner uses are mapped; unknown elements
//! and attributes are ignored.

use serde::{Deserialize, Serialize};

/// Root `<tv>` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "tv")]
pub struct Tv {
    #[serde(rename = "channel", default)]
    pub channels: Vec<Channel>,
    #[serde(rename = "programme", default)]
    pub programmes: Vec<Programme>,
}

/// `<channel>` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "display-name", default)]
    pub display_names: Vec<Text>,
    #[serde(rename = "icon", default)]
    pub icons: Vec<Icon>,
    #[serde(rename = "url", default)]
    pub urls: Vec<String>,
    /// Logical channel number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lcn: Option<String>,
}

/// Text with an optional language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "@lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// `<icon>` element; sizes are kept as written in the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    #[serde(rename = "@src")]
    pub source: String,
    #[serde(rename = "@width", default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(rename = "@height", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

/// `<episode-num>` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeNum {
    #[serde(rename = "@system", default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// `<programme>` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Programme {
    #[serde(rename = "@start")]
    pub start: String,
    #[serde(rename = "@stop", default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    #[serde(rename = "@channel")]
    pub channel: String,
    #[serde(rename = "title", default)]
    pub titles: Vec<Text>,
    #[serde(rename = "sub-title", default)]
    pub secondary_titles: Vec<Text>,
    #[serde(rename = "desc", default)]
    pub descriptions: Vec<Text>,
    #[serde(rename = "category", default)]
    pub categories: Vec<Text>,
    #[serde(rename = "icon", default)]
    pub icons: Vec<Icon>,
    #[serde(rename = "episode-num", default)]
    pub episode_nums: Vec<EpisodeNum>,
}

impl Programme {
    /// First title, if any
    pub fn title(&self) -> Option<&str> {
        self.titles.first().map(|t| t.value.as_str())
    }
}

/// Parses an XMLTV document
pub fn parse(document: &str) -> Result<Tv, quick_xml::DeError> {
    quick_xml::de::from_str(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE tv SYSTEM "xmltv.dtd">
<tv generator-info-name="test">
  <channel id="France5.fr">
    <display-name lang="fr">France 5</display-name>
    <display-name>F5</display-name>
    <icon src="http://logos/f5.png" width="120" height="90"/>
    <lcn>5</lcn>
  </channel>
  <channel id="Arte.fr">
    <display-name>Arte</display-name>
  </channel>
  <programme start="20261016200000 +0200" stop="20261016210000 +0200" channel="France5.fr">
    <title lang="fr">La Grande Librairie</title>
    <desc>Magazine littéraire</desc>
    <category>Culture</category>
    <episode-num system="onscreen">S12E04</episode-num>
    <rating system="CSA"><value>Tout public</value></rating>
  </programme>
</tv>"#;

    #[test]
    fn test_parse_sample() {
        let tv = parse(SAMPLE).unwrap();
        assert_eq!(tv.channels.len(), 2);
        assert_eq!(tv.channels[0].display_names[1].value, "F5");
        assert_eq!(tv.channels[0].lcn.as_deref(), Some("5"));
        assert_eq!(tv.channels[0].icons[0].width.as_deref(), Some("120"));
        assert!(tv.channels[1].lcn.is_none());

        assert_eq!(tv.programmes.len(), 1);
        let p = &tv.programmes[0];
        assert_eq!(p.channel, "France5.fr");
        assert_eq!(p.title(), Some("La Grande Librairie"));
        assert_eq!(p.episode_nums[0].system.as_deref(), Some("onscreen"));
    }

    #[test]
    fn test_parse_interleaved_elements() {
        // guides concaténés : chaînes et programmes alternent
        let document = r#"<tv>
  <channel id="A">
    <display-name>Alpha</display-name>
    <icon src="http://logos/a.png"/>
    <display-name>A</display-name>
  </channel>
  <programme start="20261016200000 +0200" channel="A"><title>Un</title></programme>
  <channel id="B"><display-name>Beta</display-name></channel>
  <programme start="20261016210000 +0200" channel="B"><title>Deux</title></programme>
</tv>"#;

        let tv = parse(document).unwrap();
        assert_eq!(tv.channels.len(), 2);
        assert_eq!(tv.channels[0].display_names.len(), 2);
        assert_eq!(tv.channels[0].display_names[1].value, "A");
        assert_eq!(tv.channels[0].icons.len(), 1);
        assert_eq!(tv.channels[1].id, "B");
        assert_eq!(tv.programmes.len(), 2);
        assert_eq!(tv.programmes[1].title(), Some("Deux"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("<tv><channel></tv>").is_err());
    }
}
