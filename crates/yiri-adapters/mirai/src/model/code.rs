//! The mirai code string format.
//!
//! Literal text is written as-is with `[ ] : , \` escaped by a backslash and
//! line breaks written as `\n` / `\r`. Every other component becomes a
//! bracketed code:
//!
//! | Component    | Code                           |
//! |--------------|--------------------------------|
//! | `At`         | `[mirai:at:10001]`             |
//! | `AtAll`      | `[mirai:atall]`                |
//! | `Face`       | `[mirai:face:178]`             |
//! | `Face`       | `[mirai:face:微笑]`, `[mirai:face:,123]` for a numeric name |
//! | `Image`      | `[mirai:image:{UUID}.jpg]`     |
//! | `FlashImage` | `[mirai:flash:{UUID}.jpg]`     |
//! | `App`        | `[mirai:app:ESCAPED_CONTENT]`  |
//! | `Poke`       | `[mirai:poke:BiXin,2,-1]`      |
//! | `Dice`       | `[mirai:dice:6]`               |
//!
//! A `MiraiCode` component is emitted verbatim. Kinds without a code render
//! as the empty string.

use crate::error::{ParseError, ParseErrorKind};
use crate::model::component::{FaceData, MessageComponent, PokeName};

const PREFIX: &str = "mirai:";

/// Escapes literal text for use in a code string.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '[' | ']' | ':' | ',' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverses [`escape`].
pub fn unescape(text: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((offset, ch)) = chars.next() {
        if ch == '\\' {
            out.push(unescape_next(offset, chars.next())?);
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

fn unescape_next(offset: usize, next: Option<(usize, char)>) -> Result<char, ParseError> {
    match next {
        Some((_, ch @ ('[' | ']' | ':' | ',' | '\\'))) => Ok(ch),
        Some((_, 'n')) => Ok('\n'),
        Some((_, 'r')) => Ok('\r'),
        Some((_, other)) => Err(ParseError::new(offset, ParseErrorKind::InvalidEscape(other))),
        None => Err(ParseError::new(offset, ParseErrorKind::DanglingEscape)),
    }
}

/// Renders one component in code form.
pub fn encode(component: &MessageComponent) -> String {
    match component {
        MessageComponent::Plain(data) => escape(&data.text),
        MessageComponent::At(data) => format!("[mirai:at:{}]", data.target),
        MessageComponent::AtAll => "[mirai:atall]".to_string(),
        MessageComponent::Face(data) => match (data.face_id, &data.name) {
            (Some(id), _) => format!("[mirai:face:{id}]"),
            // A numeric name would read back as an id, so it goes after an empty id.
            (None, Some(name)) if name.parse::<i64>().is_ok() => format!("[mirai:face:,{name}]"),
            (None, Some(name)) => format!("[mirai:face:{}]", escape(name)),
            (None, None) => String::new(),
        },
        MessageComponent::Image(data) => data
            .image_id
            .as_deref()
            .map(|id| format!("[mirai:image:{}]", escape(id)))
            .unwrap_or_default(),
        MessageComponent::FlashImage(data) => data
            .image_id
            .as_deref()
            .map(|id| format!("[mirai:flash:{}]", escape(id)))
            .unwrap_or_default(),
        MessageComponent::App(data) => format!("[mirai:app:{}]", escape(&data.content)),
        MessageComponent::Poke(data) => {
            let (poke_type, poke_id) = data.name.type_and_id();
            format!("[mirai:poke:{},{poke_type},{poke_id}]", data.name)
        }
        MessageComponent::Dice(data) => format!("[mirai:dice:{}]", data.value),
        MessageComponent::MiraiCode(data) => data.code.clone(),
        _ => String::new(),
    }
}

/// Parses a code string into its components.
///
/// Adjacent literal text is merged into a single `Plain`; an empty input
/// yields no components.
pub fn parse(input: &str) -> Result<Vec<MessageComponent>, ParseError> {
    let mut components = Vec::new();
    let mut text = String::new();
    let mut chars = input.char_indices();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => text.push(unescape_next(offset, chars.next())?),
            ']' => return Err(ParseError::new(offset, ParseErrorKind::UnexpectedClose)),
            '[' => {
                let body_start = offset + 1;
                if !input[body_start..].starts_with(PREFIX) {
                    return Err(ParseError::new(offset, ParseErrorKind::MissingPrefix));
                }
                for _ in 0..PREFIX.len() {
                    chars.next();
                }

                let mut fields = vec![String::new()];
                let mut closed = false;
                while let Some((inner_offset, inner)) = chars.next() {
                    let ch = match inner {
                        '\\' => unescape_next(inner_offset, chars.next())?,
                        ']' => {
                            closed = true;
                            break;
                        }
                        ':' if fields.len() == 1 => {
                            fields.push(String::new());
                            continue;
                        }
                        ',' if fields.len() > 1 => {
                            fields.push(String::new());
                            continue;
                        }
                        _ => inner,
                    };
                    if let Some(field) = fields.last_mut() {
                        field.push(ch);
                    }
                }
                if !closed {
                    return Err(ParseError::new(offset, ParseErrorKind::Unterminated));
                }

                if !text.is_empty() {
                    components.push(MessageComponent::plain(std::mem::take(&mut text)));
                }
                let name = fields.remove(0);
                components.push(decode_code(offset, &name, fields)?);
            }
            _ => text.push(ch),
        }
    }

    if !text.is_empty() {
        components.push(MessageComponent::plain(text));
    }
    Ok(components)
}

fn decode_code(
    offset: usize,
    name: &str,
    args: Vec<String>,
) -> Result<MessageComponent, ParseError> {
    let bad = |reason: &str| {
        ParseError::new(
            offset,
            ParseErrorKind::InvalidArgument {
                code: name.to_string(),
                reason: reason.to_string(),
            },
        )
    };
    let single = |args: Vec<String>| -> Result<String, ParseError> {
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(arg), None) => Ok(arg),
            (None, _) => Err(bad("expected one argument, found none")),
            (Some(_), Some(_)) => Err(bad("expected exactly one argument")),
        }
    };

    match name {
        "at" => {
            let target = single(args)?;
            let target = target.parse().map_err(|_| bad("target is not an integer"))?;
            Ok(MessageComponent::at(target))
        }
        "atall" if args.is_empty() => Ok(MessageComponent::at_all()),
        "atall" => Err(bad("takes no arguments")),
        "face" if args.len() == 2 => {
            let mut args = args.into_iter();
            let face_id = args.next().filter(|id| !id.is_empty());
            let name = args.next().filter(|name| !name.is_empty());
            let face_id = face_id
                .map(|id| id.parse().map_err(|_| bad("face id is not an integer")))
                .transpose()?;
            if face_id.is_none() && name.is_none() {
                return Err(bad("face needs an id or a name"));
            }
            Ok(MessageComponent::Face(FaceData { face_id, name }))
        }
        "face" => {
            let arg = single(args)?;
            Ok(match arg.parse::<i64>() {
                Ok(face_id) => MessageComponent::face(face_id),
                Err(_) => MessageComponent::face_named(arg),
            })
        }
        "image" => Ok(MessageComponent::image_id(single(args)?)),
        "flash" => Ok(MessageComponent::flash_image_id(single(args)?)),
        "app" => Ok(MessageComponent::app(single(args)?)),
        "poke" => {
            let poke = args
                .first()
                .ok_or_else(|| bad("missing poke name"))?
                .parse::<PokeName>()
                .map_err(|reason| bad(reason.as_str()))?;
            for number in args.iter().skip(1) {
                number
                    .parse::<i32>()
                    .map_err(|_| bad("poke type and id must be integers"))?;
            }
            Ok(MessageComponent::poke(poke))
        }
        "dice" => {
            let value = single(args)?;
            let value = value.parse().map_err(|_| bad("value is not a small integer"))?;
            Ok(MessageComponent::dice(value))
        }
        other => Err(ParseError::new(
            offset,
            ParseErrorKind::UnknownCode(other.to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip() {
        let raw = "a[b]c:d,e\\f\ng\r";
        let escaped = escape(raw);
        assert_eq!(escaped, "a\\[b\\]c\\:d\\,e\\\\f\\ng\\r");
        assert_eq!(unescape(&escaped).unwrap(), raw);
    }

    #[test]
    fn test_unescape_errors() {
        let err = unescape("ab\\").unwrap_err();
        assert_eq!(err, ParseError::new(2, ParseErrorKind::DanglingEscape));

        let err = unescape("x\\q").unwrap_err();
        assert_eq!(err, ParseError::new(1, ParseErrorKind::InvalidEscape('q')));
    }

    #[test]
    fn test_encode_components() {
        assert_eq!(encode(&MessageComponent::at(123)), "[mirai:at:123]");
        assert_eq!(encode(&MessageComponent::face(178)), "[mirai:face:178]");
        assert_eq!(encode(&MessageComponent::face_named("123")), "[mirai:face:,123]");
        assert_eq!(encode(&MessageComponent::dice(6)), "[mirai:dice:6]");
        assert_eq!(
            encode(&MessageComponent::poke(PokeName::BiXin)),
            "[mirai:poke:BiXin,2,-1]"
        );
        assert_eq!(
            encode(&MessageComponent::app(r#"{"a":[1,2]}"#)),
            r#"[mirai:app:{"a"\:\[1\,2\]}]"#
        );
        assert_eq!(encode(&MessageComponent::image_url("http://x")), "");
        assert_eq!(encode(&MessageComponent::mirai_code("[mirai:atall]")), "[mirai:atall]");
    }

    #[test]
    fn test_parse_mixed() {
        let parsed = parse("hi [mirai:at:10001]\\[x\\][mirai:face:微笑]").unwrap();
        assert_eq!(
            parsed,
            vec![
                MessageComponent::plain("hi "),
                MessageComponent::at(10001),
                MessageComponent::plain("[x]"),
                MessageComponent::face_named("微笑"),
            ]
        );
    }

    #[test]
    fn test_parse_app_keeps_escaped_commas() {
        let content = r#"{"prompt":"a,b"}"#;
        let parsed = parse(&encode(&MessageComponent::app(content))).unwrap();
        assert_eq!(parsed, vec![MessageComponent::app(content)]);
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("ab[mirai:at:1", 2, ParseErrorKind::Unterminated),
            ("[cq:at,qq=1]", 0, ParseErrorKind::MissingPrefix),
            ("x]", 1, ParseErrorKind::UnexpectedClose),
            ("[mirai:nope:1]", 0, ParseErrorKind::UnknownCode("nope".into())),
            ("abc\\", 3, ParseErrorKind::DanglingEscape),
        ];
        for (input, offset, kind) in cases {
            assert_eq!(parse(input).unwrap_err(), ParseError::new(offset, kind), "{input}");
        }

        let err = parse("[mirai:at:alice]").unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::InvalidArgument { ref code, .. } if code == "at"
        ));
        for input in ["[mirai:poke:Nope,1,1]", "[mirai:face:,]", "[mirai:face:x,y]"] {
            let err = parse(input).unwrap_err();
            assert!(matches!(err.kind, ParseErrorKind::InvalidArgument { .. }), "{input}");
        }
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap().is_empty());
    }
}
