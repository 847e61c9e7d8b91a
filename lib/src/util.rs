use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Result as IoResult, Write};
use std::path::Path;

/// Types persisted to disk in a self-describing binary form.
pub trait Saveable
where
    Self: Sized,
{
    fn load<I: Read>(reader: I) -> IoResult<Self>;
    fn save<O: Write>(&self, writer: O) -> IoResult<()>;

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> IoResult<()> {
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        self.save(&mut writer)?;
        writer.flush()
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let file = File::open(&path)?;
        Self::load(BufReader::new(file))
    }
}

/// Strips an optional `0x`/`0X` prefix.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
