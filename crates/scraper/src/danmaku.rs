//! Danmaku payload and its bilibili-style XML encoding

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::ScraperError;

/// A single comment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DanmakuComment {
    /// Offset from the start of the video, in milliseconds
    pub progress_ms: i64,
    /// 1-3 scrolling, 4 bottom, 5 top
    pub mode: i32,
    pub font_size: i32,
    /// RGB as a decimal integer
    pub color: u32,
    /// Unix timestamp of posting
    pub ctime: i64,
    pub pool: i32,
    pub mid_hash: String,
    pub id: i64,
    pub content: String,
}

impl DanmakuComment {
    /// The `p` attribute: `time,mode,size,color,ctime,pool,midhash,id`
    fn attribute(&self) -> String {
        format!(
            "{:.5},{},{},{},{},{},{},{}",
            self.progress_ms as f64 / 1000.0,
            self.mode,
            self.font_size,
            self.color,
            self.ctime,
            self.pool,
            self.mid_hash,
            self.id
        )
    }
}

/// A danmaku track fetched for one comment id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Danmaku {
    pub chat_id: String,
    pub items: Vec<DanmakuComment>,
}

impl Danmaku {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Encode as a bilibili-compatible XML document.
    pub fn to_xml(&self) -> Result<Vec<u8>, ScraperError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(&mut writer, Event::Start(BytesStart::new("i")))?;

        let max_limit = self.items.len().to_string();
        for (tag, value) in [
            ("chatserver", "chat.bilibili.com"),
            ("chatid", self.chat_id.as_str()),
            ("mission", "0"),
            ("maxlimit", max_limit.as_str()),
            ("state", "0"),
            ("real_name", "0"),
            ("source", "k-v"),
        ] {
            write_text_element(&mut writer, tag, value)?;
        }

        for comment in &self.items {
            let p = comment.attribute();
            write(
                &mut writer,
                Event::Start(BytesStart::new("d").with_attributes([("p", p.as_str())])),
            )?;
            write(&mut writer, Event::Text(BytesText::new(&comment.content)))?;
            write(&mut writer, Event::End(BytesEnd::new("d")))?;
        }

        write(&mut writer, Event::End(BytesEnd::new("i")))?;
        Ok(writer.into_inner().into_inner())
    }
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    tag: &str,
    value: &str,
) -> Result<(), ScraperError> {
    write(writer, Event::Start(BytesStart::new(tag)))?;
    write(writer, Event::Text(BytesText::new(value)))?;
    write(writer, Event::End(BytesEnd::new(tag)))
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), ScraperError> {
    writer
        .write_event(event)
        .map_err(|e| ScraperError::Encode(e.to_string()))
}
