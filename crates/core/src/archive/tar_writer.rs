use std::fs::File;
use std::io::{self, Write};
use tar::{Builder, EntryType, Header};

use super::ArchiveLayout;

/// Write `layout` as a tar stream with fixed ownership, mode and mtime
pub fn write_tar<W: Write>(layout: &ArchiveLayout, writer: W) -> io::Result<W> {
    let mut builder = Builder::new(writer);

    for entry in layout.entries() {
        let file = File::open(&entry.source)?;
        let size = file.metadata()?.len();

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(size);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        builder.append_data(&mut header, &entry.destination, file)?;
    }

    builder.into_inner()
}
