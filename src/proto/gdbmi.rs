/* GDB machine-interface (MI) record parser. Covers the record classes and
 * value grammar the debug drivers rely on: result records with nested
 * tuple/list payloads, async records, and the stream outputs. */

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MiError {
    #[error("empty MI line")]
    Empty,

    #[error("malformed MI record: {0}")]
    Malformed(String),
}

/* An MI value: a C-string constant, a {k=v,...} tuple, or a [...] list. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiValue {
    Const(String),
    Tuple(Vec<(String, MiValue)>),
    List(Vec<MiValue>),
}

impl MiValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MiValue::Const(s) => Some(s),
            _ => None,
        }
    }

    /* Field lookup on a tuple value. */
    pub fn field(&self, key: &str) -> Option<&MiValue> {
        match self {
            MiValue::Tuple(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn items(&self) -> &[MiValue] {
        match self {
            MiValue::List(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiRecord {
    /* ^class,k=v,... */
    Result {
        class: MiResultClass,
        results: Vec<(String, MiValue)>,
    },
    /* *class,k=v,... (execution state changes) */
    ExecAsync {
        class: String,
        results: Vec<(String, MiValue)>,
    },
    /* =class,k=v,... (notifications) */
    Notify {
        class: String,
        results: Vec<(String, MiValue)>,
    },
    /* ~"...", @"...", &"..." */
    ConsoleStream(String),
    TargetStream(String),
    LogStream(String),
    /* The "(gdb)" ready prompt. */
    Prompt,
}

impl MiRecord {
    pub fn results(&self) -> &[(String, MiValue)] {
        match self {
            MiRecord::Result { results, .. }
            | MiRecord::ExecAsync { results, .. }
            | MiRecord::Notify { results, .. } => results,
            _ => &[],
        }
    }

    pub fn result_field(&self, key: &str) -> Option<&MiValue> {
        self.results().iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, MiRecord::Result { class: MiResultClass::Done, .. })
    }

    /* The msg="..." payload of an ^error record. */
    pub fn error_message(&self) -> Option<&str> {
        match self {
            MiRecord::Result { class: MiResultClass::Error, .. } => {
                self.result_field("msg").and_then(MiValue::as_str)
            }
            _ => None,
        }
    }
}

/* Parse one MI output line. Leading numeric tokens are accepted and
 * discarded. */
pub fn parse_line(line: &str) -> Result<MiRecord, MiError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(MiError::Empty);
    }
    if line == "(gdb)" || line == "(gdb) " {
        return Ok(MiRecord::Prompt);
    }

    /* Optional token prefix: digits before the record sigil. */
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let mut chars = rest.char_indices();
    let (_, sigil) = chars.next().ok_or(MiError::Empty)?;
    let body = &rest[1..];

    match sigil {
        '^' => {
            let (class_str, results) = parse_class_and_results(body)?;
            let class = match class_str.as_str() {
                "done" => MiResultClass::Done,
                "running" => MiResultClass::Running,
                "connected" => MiResultClass::Connected,
                "error" => MiResultClass::Error,
                "exit" => MiResultClass::Exit,
                other => return Err(MiError::Malformed(format!("result class '{other}'"))),
            };
            Ok(MiRecord::Result { class, results })
        }
        '*' => {
            let (class, results) = parse_class_and_results(body)?;
            Ok(MiRecord::ExecAsync { class, results })
        }
        '=' => {
            let (class, results) = parse_class_and_results(body)?;
            Ok(MiRecord::Notify { class, results })
        }
        '~' => Ok(MiRecord::ConsoleStream(parse_cstring_whole(body)?)),
        '@' => Ok(MiRecord::TargetStream(parse_cstring_whole(body)?)),
        '&' => Ok(MiRecord::LogStream(parse_cstring_whole(body)?)),
        other => Err(MiError::Malformed(format!("unknown sigil '{other}'"))),
    }
}

fn parse_class_and_results(body: &str) -> Result<(String, Vec<(String, MiValue)>), MiError> {
    match body.split_once(',') {
        None => Ok((body.to_string(), Vec::new())),
        Some((class, rest)) => {
            let mut parser = Parser { input: rest.as_bytes(), pos: 0 };
            let results = parser.parse_results()?;
            Ok((class.to_string(), results))
        }
    }
}

fn parse_cstring_whole(body: &str) -> Result<String, MiError> {
    let mut parser = Parser { input: body.as_bytes(), pos: 0 };
    parser.parse_cstring()
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, b: u8) -> Result<(), MiError> {
        match self.bump() {
            Some(got) if got == b => Ok(()),
            got => Err(MiError::Malformed(format!(
                "expected '{}', got {:?} at {}",
                b as char, got.map(|g| g as char), self.pos
            ))),
        }
    }

    /* k=v,k=v,... until end of input. */
    fn parse_results(&mut self) -> Result<Vec<(String, MiValue)>, MiError> {
        let mut results = Vec::new();
        loop {
            let key = self.parse_key()?;
            self.expect(b'=')?;
            let value = self.parse_value()?;
            results.push((key, value));
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                None => break,
                Some(other) => {
                    return Err(MiError::Malformed(format!(
                        "unexpected '{}' after value",
                        other as char
                    )));
                }
            }
        }
        Ok(results)
    }

    fn parse_key(&mut self) -> Result<String, MiError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'=' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(MiError::Malformed("empty result key".into()));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn parse_value(&mut self) -> Result<MiValue, MiError> {
        match self.peek() {
            Some(b'"') => Ok(MiValue::Const(self.parse_cstring()?)),
            Some(b'{') => {
                self.pos += 1;
                if self.peek() == Some(b'}') {
                    self.pos += 1;
                    return Ok(MiValue::Tuple(Vec::new()));
                }
                let mut fields = Vec::new();
                loop {
                    let key = self.parse_tuple_key()?;
                    self.expect(b'=')?;
                    let value = self.parse_value()?;
                    fields.push((key, value));
                    match self.bump() {
                        Some(b',') => continue,
                        Some(b'}') => break,
                        got => {
                            return Err(MiError::Malformed(format!(
                                "expected ',' or '}}' in tuple, got {:?}",
                                got.map(|g| g as char)
                            )));
                        }
                    }
                }
                Ok(MiValue::Tuple(fields))
            }
            Some(b'[') => {
                self.pos += 1;
                if self.peek() == Some(b']') {
                    self.pos += 1;
                    return Ok(MiValue::List(Vec::new()));
                }
                let mut items = Vec::new();
                loop {
                    /* List elements may be plain values or key=value
                     * results; keys are dropped, the values kept. */
                    if self.looks_like_keyed_item() {
                        let _key = self.parse_tuple_key()?;
                        self.expect(b'=')?;
                    }
                    items.push(self.parse_value()?);
                    match self.bump() {
                        Some(b',') => continue,
                        Some(b']') => break,
                        got => {
                            return Err(MiError::Malformed(format!(
                                "expected ',' or ']' in list, got {:?}",
                                got.map(|g| g as char)
                            )));
                        }
                    }
                }
                Ok(MiValue::List(items))
            }
            got => Err(MiError::Malformed(format!(
                "expected value, got {:?}",
                got.map(|g| g as char)
            ))),
        }
    }

    /* Key inside a tuple/list: identifier chars up to '='. */
    fn parse_tuple_key(&mut self) -> Result<String, MiError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'=' || b == b',' || b == b'}' || b == b']' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(MiError::Malformed("empty tuple key".into()));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn looks_like_keyed_item(&self) -> bool {
        let mut i = self.pos;
        while let Some(b) = self.input.get(i) {
            match b {
                b'=' => return true,
                b'"' | b'{' | b'[' | b',' | b']' => return false,
                _ => i += 1,
            }
        }
        false
    }

    /* Parse a double-quoted C string with escapes. */
    fn parse_cstring(&mut self) -> Result<String, MiError> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None => return Err(MiError::Malformed("unterminated string".into())),
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b'\\') => out.push(b'\\'),
                    Some(b'"') => out.push(b'"'),
                    Some(other) => {
                        out.push(b'\\');
                        out.push(other);
                    }
                    None => return Err(MiError::Malformed("dangling escape".into())),
                },
                Some(b) => out.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_done() {
        assert!(parse_line("^done").unwrap().is_done());
        assert!(parse_line("^done\r\n").unwrap().is_done());
    }

    #[test]
    fn parse_prompt() {
        assert_eq!(parse_line("(gdb)").unwrap(), MiRecord::Prompt);
    }

    #[test]
    fn parse_tokened_record() {
        let rec = parse_line("42^done").unwrap();
        assert!(rec.is_done());
    }

    #[test]
    fn parse_error_with_message() {
        let rec = parse_line("^error,msg=\"No symbol table is loaded.\"").unwrap();
        assert_eq!(rec.error_message(), Some("No symbol table is loaded."));
    }

    #[test]
    fn parse_console_stream_with_escapes() {
        let rec = parse_line("~\"Target voltage: 3.3V\\n\"").unwrap();
        assert_eq!(rec, MiRecord::ConsoleStream("Target voltage: 3.3V\n".into()));
    }

    #[test]
    fn parse_running_class() {
        let rec = parse_line("^running").unwrap();
        assert!(matches!(rec, MiRecord::Result { class: MiResultClass::Running, .. }));
    }

    #[test]
    fn parse_stopped_async_record() {
        let rec = parse_line(
            "*stopped,reason=\"breakpoint-hit\",bkptno=\"1\",frame={addr=\"0x08000130\",func=\"main\"}",
        )
        .unwrap();
        match &rec {
            MiRecord::ExecAsync { class, .. } => assert_eq!(class, "stopped"),
            other => panic!("expected exec-async, got {other:?}"),
        }
        let frame = rec.result_field("frame").unwrap();
        assert_eq!(frame.field("addr").unwrap().as_str(), Some("0x08000130"));
    }

    #[test]
    fn parse_memory_read_payload() {
        let rec = parse_line(
            "^done,memory=[{begin=\"0x08000000\",offset=\"0x0\",end=\"0x08000004\",contents=\"efbeadde\"}]",
        )
        .unwrap();
        let memory = rec.result_field("memory").unwrap();
        let first = &memory.items()[0];
        assert_eq!(first.field("contents").unwrap().as_str(), Some("efbeadde"));
    }

    #[test]
    fn parse_breakpoint_insert_payload() {
        let rec = parse_line(
            "^done,bkpt={number=\"2\",type=\"breakpoint\",addr=\"0x08000100\",times=\"0\"}",
        )
        .unwrap();
        let bkpt = rec.result_field("bkpt").unwrap();
        assert_eq!(bkpt.field("number").unwrap().as_str(), Some("2"));
        assert_eq!(bkpt.field("addr").unwrap().as_str(), Some("0x08000100"));
    }

    #[test]
    fn parse_register_values() {
        let rec = parse_line(
            "^done,register-values=[{number=\"0\",value=\"0x1234\"},{number=\"15\",value=\"0x08000130\"}]",
        )
        .unwrap();
        let regs = rec.result_field("register-values").unwrap();
        assert_eq!(regs.items().len(), 2);
        assert_eq!(regs.items()[1].field("value").unwrap().as_str(), Some("0x08000130"));
    }

    #[test]
    fn parse_notify_record() {
        let rec = parse_line("=thread-created,id=\"1\",group-id=\"i1\"").unwrap();
        match rec {
            MiRecord::Notify { class, results } => {
                assert_eq!(class, "thread-created");
                assert_eq!(results.len(), 2);
            }
            other => panic!("expected notify, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty_list_and_tuple() {
        let rec = parse_line("^done,stack=[],frame={}").unwrap();
        assert_eq!(rec.result_field("stack").unwrap(), &MiValue::List(Vec::new()));
        assert_eq!(rec.result_field("frame").unwrap(), &MiValue::Tuple(Vec::new()));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(parse_line(""), Err(MiError::Empty));
        assert!(parse_line("^banana").is_err());
        assert!(parse_line("^done,msg=\"unterminated").is_err());
        assert!(parse_line("!wat").is_err());
    }
}
