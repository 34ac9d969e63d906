//! Synthetic `.vmss`/`.vmsn` byte-buffer builder for the integration test
//! suite. Mirrors `src/test_support.rs`'s unit-test builder but lives in
//! `tests/` since integration tests compile against `vmsnparse` as an
//! external crate and cannot reach a `pub(crate)` module.

pub fn offset_width_bytes(magic: u32) -> usize {
    if magic == 0xBED2BED0 {
        4
    } else {
        8
    }
}

fn write_offset(buf: &mut Vec<u8>, width: usize, value: u64) {
    if width == 4 {
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

pub struct GroupBuilder {
    name: String,
    offset_width: usize,
    tag_stream: Vec<u8>,
}

impl GroupBuilder {
    fn new(name: &str, offset_width: usize) -> Self {
        Self {
            name: name.to_string(),
            offset_width,
            tag_stream: Vec::new(),
        }
    }

    pub fn add_tag(&mut self, name: &str, indices: &[u32], payload: &[u8]) {
        assert!(indices.len() <= 3, "at most 3 index dimensions");

        let dims = indices.len() as u8;
        let len = payload.len();

        self.tag_stream.push(0);
        let flags_pos = self.tag_stream.len() - 1;

        self.tag_stream.push(name.len() as u8);
        self.tag_stream.extend_from_slice(name.as_bytes());
        for idx in indices {
            self.tag_stream.extend_from_slice(&idx.to_le_bytes());
        }

        if len < 62 {
            self.tag_stream[flags_pos] = (dims << 6) | (len as u8 & 0x3f);
            self.tag_stream.extend_from_slice(payload);
        } else {
            self.tag_stream[flags_pos] = (dims << 6) | 62u8;
            write_offset(&mut self.tag_stream, self.offset_width, len as u64);
            write_offset(&mut self.tag_stream, self.offset_width, len as u64);
            self.tag_stream.extend_from_slice(&[0u8, 0u8]);
            self.tag_stream.extend_from_slice(payload);
        }
    }

    pub fn add_u32_tag(&mut self, name: &str, indices: &[u32], value: u32) {
        self.add_tag(name, indices, &value.to_le_bytes());
    }

    fn finish(mut self) -> (String, Vec<u8>) {
        self.tag_stream.push(0);
        self.tag_stream.push(0);
        (self.name, self.tag_stream)
    }
}

pub struct SnapshotBuilder {
    magic: u32,
    offset_width: usize,
    groups: Vec<(String, Vec<u8>)>,
}

impl SnapshotBuilder {
    pub fn new(magic: u32) -> Self {
        Self {
            magic,
            offset_width: offset_width_bytes(magic),
            groups: Vec::new(),
        }
    }

    pub fn add_group(&mut self, name: &str, build: impl FnOnce(&mut GroupBuilder)) {
        let mut g = GroupBuilder::new(name, self.offset_width);
        build(&mut g);
        self.groups.push(g.finish());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let group_count = self.groups.len() as u32;
        let table_start = 12u64;
        let table_size = 80u64 * u64::from(group_count);

        let mut tag_cursor = table_start + table_size;
        let mut entries = Vec::with_capacity(self.groups.len());
        let mut blobs = Vec::with_capacity(self.groups.len());
        for (name, blob) in &self.groups {
            entries.push((name.clone(), tag_cursor));
            tag_cursor += blob.len() as u64;
            blobs.push(blob.clone());
        }

        let mut out = Vec::new();
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&group_count.to_le_bytes());

        for (name, offset) in &entries {
            let mut name_field = vec![0u8; 64];
            let name_bytes = name.as_bytes();
            name_field[..name_bytes.len()].copy_from_slice(name_bytes);
            out.extend_from_slice(&name_field);
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]);
        }

        for blob in blobs {
            out.extend_from_slice(&blob);
        }

        out
    }
}
