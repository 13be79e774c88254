//! Content sniffing used to pick a backend for an existing settings file.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// True when the file starts with the SQLite database header.
pub fn is_sqlite_file(path: &Path) -> bool {
    let mut header = [0u8; 16];
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    match file.read_exact(&mut header) {
        Ok(()) => &header == SQLITE_MAGIC,
        Err(_) => false,
    }
}

/// True when the file parses as well-formed XML with a root element.
pub fn is_xml_file(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(content) => is_well_formed_xml(&content),
        Err(_) => false,
    }
}

pub fn is_well_formed_xml(content: &str) -> bool {
    let mut reader = Reader::from_str(content);
    reader.config_mut().check_end_names = true;
    let mut depth = 0usize;
    let mut roots = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::End(_)) => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Ok(Event::Text(ref t)) if depth == 0 => {
                if !t.iter().all(|b| b.is_ascii_whitespace()) {
                    return false;
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return false,
            _ => {}
        }
    }
    depth == 0 && roots == 1
}
