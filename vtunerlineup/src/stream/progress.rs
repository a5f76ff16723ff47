//! Lecture de la progression du décodeur sur sa sortie d'erreur

use bytes::BytesMut;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io;
use tokio_util::codec::Decoder;
use utoipa::ToSchema;

/// Longueur au-delà de laquelle un fragment sans fin de ligne est émis tel quel
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

static EQUALS_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"=\s+").expect("valid regex"));

/// Dernier état connu du décodeur
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DecoderStatus {
    pub frames: String,
    pub time: String,
    pub bitrate: String,
    pub speed: String,
}

impl DecoderStatus {
    /// Analyse une ligne de statistiques du décodeur
    ///
    /// La ligne doit contenir `frame=`, `time=`, `bitrate=` et `speed=` ;
    /// sinon `None`.
    ///
    /// ```
    /// use vtunerlineup::DecoderStatus;
    ///
    /// let status = DecoderStatus::parse("frame=  10 time=00:00:01.00 bitrate= 100.0kbits/s speed=1x").unwrap();
    /// assert_eq!(status.frames, "10");
    /// assert_eq!(status.speed, "1.000x");
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        if !["frame=", "time=", "bitrate=", "speed="]
            .iter()
            .all(|token| line.contains(token))
        {
            return None;
        }

        let line = EQUALS_SPACING.replace_all(line, "=");
        let mut status = Self::default();
        for field in line.split_whitespace() {
            let Some((name, value)) = field.split_once('=') else {
                continue;
            };
            match name {
                "frame" => status.frames = value.to_string(),
                "time" => status.time = value.to_string(),
                "bitrate" => status.bitrate = value.to_string(),
                "speed" if value == "1x" => status.speed = "1.000x".to_string(),
                "speed" => status.speed = value.to_string(),
                _ => {}
            }
        }
        Some(status)
    }
}

/// Découpe la sortie d'erreur en lignes
///
/// Les lignes se terminent par `\n` ou `\r` (ffmpeg redessine sa ligne de
/// progression avec `\r`). Les fragments vides sont ignorés.
#[derive(Debug, Default)]
pub struct ProgressLineCodec {
    // position jusqu'où le tampon a déjà été parcouru
    next_index: usize,
}

impl ProgressLineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for ProgressLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let found = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r');

            match found {
                Some(offset) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let line = buf.split_to(end + 1);
                    let text = &line[..end];
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(Some(to_line(text)));
                }
                None if buf.len() >= MAX_LINE_LENGTH => {
                    self.next_index = 0;
                    let line = buf.split_to(MAX_LINE_LENGTH);
                    return Ok(Some(to_line(&line)));
                }
                None => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split_to(buf.len());
        Ok(Some(to_line(&rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let status = DecoderStatus::parse(
            "frame=  10 fps=25 q=-1.0 size=  100kB time=00:00:01.00 bitrate= 100.0kbits/s speed=1x",
        )
        .unwrap();
        assert_eq!(
            status,
            DecoderStatus {
                frames: "10".into(),
                time: "00:00:01.00".into(),
                bitrate: "100.0kbits/s".into(),
                speed: "1.000x".into(),
            }
        );
    }

    #[test]
    fn test_parse_keeps_other_speeds() {
        let status =
            DecoderStatus::parse("frame=1 time=00:00:00.04 bitrate=N/A speed=0.98x").unwrap();
        assert_eq!(status.speed, "0.98x");
        assert_eq!(status.bitrate, "N/A");
    }

    #[test]
    fn test_parse_requires_all_tokens() {
        assert!(DecoderStatus::parse("frame=  10 time=00:00:01.00 bitrate= 100.0kbits/s").is_none());
        assert!(DecoderStatus::parse("time=00:00:01.00 bitrate=1 speed=1x").is_none());
        assert!(DecoderStatus::parse("Input #0, hls, from 'http://source'").is_none());
        assert!(DecoderStatus::parse("").is_none());
    }

    fn decode_all(input: &[u8]) -> Vec<String> {
        let mut codec = ProgressLineCodec::new();
        let mut buf = BytesMut::from(input);
        let mut lines = Vec::new();
        while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_split_on_newline_and_carriage_return() {
        assert_eq!(
            decode_all(b"first\rsecond\r\nthird\n\n\rlast"),
            vec!["first", "second", "third", "last"]
        );
    }

    #[test]
    fn test_partial_line_waits_for_delimiter() {
        let mut codec = ProgressLineCodec::new();
        let mut buf = BytesMut::from(&b"frame=1"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"0 speed=1x\r");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("frame=10 speed=1x"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_long_fragment_is_flushed() {
        let mut codec = ProgressLineCodec::new();
        let mut buf = BytesMut::from(vec![b'x'; MAX_LINE_LENGTH + 10].as_slice());
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE_LENGTH);
        assert_eq!(buf.len(), 10);
    }
}
