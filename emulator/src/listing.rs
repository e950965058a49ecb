use std::fmt;

/// Data column width, so the disassembly lines up across instructions.
const DATA_COLUMN: usize = 20;

/// One unit of instruction stream, as fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    Byte(u8),
    Word(u16),
    Long(u32),
}

impl fmt::Display for Fetched {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fetched::Byte(b) => write!(f, "{b:02x} "),
            Fetched::Word(w) => write!(f, "{w:04x} "),
            Fetched::Long(l) => write!(f, "{l:08x} "),
        }
    }
}

/// A listing line for one step, holding only what the step's show flags
/// asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub addr: Option<u32>,
    pub data: Option<Vec<Fetched>>,
    pub text: Option<String>,
}

impl Listing {
    pub(crate) fn push(&mut self, fetched: Fetched) {
        if let Some(data) = &mut self.data {
            data.push(fetched);
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(addr) = self.addr {
            write!(f, "{addr:05x}: ")?;
        }
        let mut column = 0;
        for fetched in self.data.iter().flatten() {
            let s = fetched.to_string();
            column += s.len();
            write!(f, "{s}")?;
        }
        if let Some(text) = &self.text {
            if column > 0 {
                write!(f, "{:1$}", "", DATA_COLUMN.saturating_sub(column))?;
            }
            write!(f, "{text}")?;
        }
        Ok(())
    }
}
