//! Log line formatting for inbound messages.
//!
//! Optional parts are left out when empty or zero; nothing here can fail.

use std::fmt::Write as _;

use crate::{classify::MessageKind, context::ResolvedContext, media::MediaSummary};

/// `[GROUP:<name>] <sender>: <summary>` or `[DIRECT] <sender>: <summary>`.
pub fn format_line(context: &ResolvedContext, sender: &str, summary: &str) -> String {
    if context.is_group {
        format!("[GROUP:{}] {sender}: {summary}", context.group_name)
    } else {
        format!("[DIRECT] {sender}: {summary}")
    }
}

/// Summary for a non-text kind.
pub fn media_summary(media: &MediaSummary) -> String {
    let mut out = format!("[{}]", media.kind.tag());
    match media.kind {
        MessageKind::Image => {
            push_mimetype(&mut out, &media.mimetype);
            push_caption(&mut out, &media.caption);
        }
        MessageKind::Video => {
            push_mimetype(&mut out, &media.mimetype);
            push_duration(&mut out, media.duration_seconds);
            push_caption(&mut out, &media.caption);
        }
        MessageKind::Audio => {
            push_mimetype(&mut out, &media.mimetype);
            push_duration(&mut out, media.duration_seconds);
        }
        MessageKind::Document => {
            if !media.file_name.is_empty() {
                let _ = write!(out, " {}", media.file_name);
            }
            push_mimetype(&mut out, &media.mimetype);
            if media.file_length > 0 {
                let _ = write!(out, " - {} bytes", media.file_length);
            }
        }
        MessageKind::Sticker | MessageKind::Contact | MessageKind::Location => {}
        MessageKind::Text | MessageKind::Unknown => return unsupported_summary(media.kind),
    }
    out
}

pub fn unsupported_summary(kind: MessageKind) -> String {
    format!("[{}] Not supported", kind.tag())
}

fn push_mimetype(out: &mut String, mimetype: &str) {
    if !mimetype.is_empty() {
        let _ = write!(out, " ({mimetype})");
    }
}

fn push_caption(out: &mut String, caption: &str) {
    if !caption.is_empty() {
        let _ = write!(out, " - Caption: {caption}");
    }
}

fn push_duration(out: &mut String, seconds: u32) {
    if seconds > 0 {
        let _ = write!(out, " - {seconds}s");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(kind: MessageKind) -> MediaSummary {
        MediaSummary {
            kind,
            mimetype: String::new(),
            caption: String::new(),
            duration_seconds: 0,
            file_name: String::new(),
            file_length: 0,
        }
    }

    #[test]
    fn direct_and_group_prefixes() {
        let direct = ResolvedContext::direct("Ana");
        assert_eq!(format_line(&direct, "Ana", "hola"), "[DIRECT] Ana: hola");

        let group = ResolvedContext::group("unknown group", "Ana");
        let line = format_line(&group, "Ana", "hola");
        assert_eq!(line, "[GROUP:unknown group] Ana: hola");
        assert!(!line.contains("[DIRECT]"));
    }

    #[test]
    fn document_with_all_fields() {
        let mut m = media(MessageKind::Document);
        m.file_name = "report.pdf".into();
        m.mimetype = "application/pdf".into();
        m.file_length = 2048;
        assert_eq!(
            media_summary(&m),
            "[DOCUMENT] report.pdf (application/pdf) - 2048 bytes"
        );
    }

    #[test]
    fn document_without_fields_is_bare_tag() {
        assert_eq!(media_summary(&media(MessageKind::Document)), "[DOCUMENT]");
    }

    #[test]
    fn audio_omits_zero_duration() {
        let mut m = media(MessageKind::Audio);
        m.mimetype = "audio/ogg".into();
        let s = media_summary(&m);
        assert_eq!(s, "[AUDIO] (audio/ogg)");
        assert!(!s.contains("0s"));

        m.duration_seconds = 12;
        assert_eq!(media_summary(&m), "[AUDIO] (audio/ogg) - 12s");
    }

    #[test]
    fn image_and_video_captions() {
        let mut img = media(MessageKind::Image);
        img.mimetype = "image/jpeg".into();
        img.caption = "look".into();
        assert_eq!(media_summary(&img), "[IMAGE] (image/jpeg) - Caption: look");

        let mut vid = media(MessageKind::Video);
        vid.mimetype = "video/mp4".into();
        vid.duration_seconds = 31;
        vid.caption = "demo".into();
        assert_eq!(
            media_summary(&vid),
            "[VIDEO] (video/mp4) - 31s - Caption: demo"
        );

        vid.caption.clear();
        vid.duration_seconds = 0;
        assert_eq!(media_summary(&vid), "[VIDEO] (video/mp4)");
    }

    #[test]
    fn fixed_tags_carry_no_content() {
        let mut sticker = media(MessageKind::Sticker);
        sticker.mimetype = "image/webp".into();
        assert_eq!(media_summary(&sticker), "[STICKER]");
        assert_eq!(media_summary(&media(MessageKind::Contact)), "[CONTACT]");
        assert_eq!(media_summary(&media(MessageKind::Location)), "[LOCATION]");
    }

    #[test]
    fn unsupported_uses_kind_tag() {
        assert_eq!(
            unsupported_summary(MessageKind::Unknown),
            "[UNKNOWN] Not supported"
        );
    }
}
