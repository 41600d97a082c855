//! Move record and its persisted buffer.
//!
//! The record is kept in memory and re-serialized after every accepted
//! ply, so the buffer handed to [`RecordManager::persist`] is always a
//! complete record. Layout of the serialized form:
//!
//! ```text
//! 0..4    magic "GREC"
//! 4..8    version (u32 LE)
//! 8..12   ply count (u32 LE)
//! 12..16  CRC32 of the payload (u32 LE)
//! 16..20  reserved
//! 20..    payload: board size, komi (f32 LE), handicap, ruleset, level,
//!         random seed (u64 LE), then two bytes per ply (color, point)
//! ```

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::engine::handicap_points;
use crate::error::{RecordError, Result};
use crate::types::{BOARD_SIZE, Color, Move, Ply, Point};

const MAGIC: &[u8; 4] = b"GREC";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 20;
const FIELDS_SIZE: usize = 16;
const PLY_SIZE: usize = 2;

const COLOR_BLACK: u8 = 1;
const COLOR_WHITE: u8 = 2;
const PASS_CODE: u8 = 0xFE;
const RESIGN_CODE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ruleset {
    Japanese,
    #[default]
    Chinese,
}

impl Ruleset {
    fn code(self) -> u8 {
        match self {
            Self::Japanese => 0,
            Self::Chinese => 1,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Japanese),
            1 => Some(Self::Chinese),
            _ => None,
        }
    }

    fn sgf_name(self) -> &'static str {
        match self {
            Self::Japanese => "Japanese",
            Self::Chinese => "Chinese",
        }
    }
}

/// Game metadata stored ahead of the plies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    pub board_size: u8,
    pub komi: f32,
    /// Handicap stones actually placed.
    pub handicap: u8,
    pub ruleset: Ruleset,
    pub level: u8,
    pub random_seed: u64,
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self {
            board_size: BOARD_SIZE as u8,
            komi: 0.0,
            handicap: 0,
            ruleset: Ruleset::default(),
            level: 0,
            random_seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoveRecord {
    pub header: RecordHeader,
    pub plies: Vec<Ply>,
}

impl MoveRecord {
    pub fn new(header: RecordHeader) -> Self {
        Self {
            header,
            plies: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(FIELDS_SIZE + self.plies.len() * PLY_SIZE);
        payload.push(self.header.board_size);
        payload.extend_from_slice(&self.header.komi.to_le_bytes());
        payload.push(self.header.handicap);
        payload.push(self.header.ruleset.code());
        payload.push(self.header.level);
        payload.extend_from_slice(&self.header.random_seed.to_le_bytes());
        for ply in &self.plies {
            payload.push(match ply.color {
                Color::Black => COLOR_BLACK,
                Color::White => COLOR_WHITE,
            });
            payload.push(match ply.mv {
                Move::Play(point) => point.index() as u8,
                Move::Pass => PASS_CODE,
                Move::Resign => RESIGN_CODE,
            });
        }

        let crc = crc32fast::hash(&payload);
        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(self.plies.len() as u32).to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    pub fn decode(data: &[u8]) -> std::result::Result<Self, RecordError> {
        if data.len() < HEADER_SIZE {
            return Err(RecordError::TooShort {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if &data[0..4] != MAGIC {
            return Err(RecordError::Magic);
        }

        let version = read_u32_le(data, 4)?;
        if version != VERSION {
            return Err(RecordError::Version {
                expected: VERSION,
                actual: version,
            });
        }

        let num_plies = read_u32_le(data, 8)? as usize;
        let expected_crc = read_u32_le(data, 12)?;
        let payload = &data[HEADER_SIZE..];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(RecordError::Checksum {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        if payload.len() < FIELDS_SIZE {
            return Err(RecordError::Truncated("header fields"));
        }
        let board_size = payload[0];
        if board_size == 0 {
            return Err(RecordError::InvalidHeader("board size"));
        }
        let komi = f32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
        if !komi.is_finite() {
            return Err(RecordError::InvalidHeader("komi"));
        }
        let handicap = payload[5];
        let ruleset =
            Ruleset::from_code(payload[6]).ok_or(RecordError::InvalidHeader("ruleset"))?;
        let level = payload[7];
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&payload[8..16]);
        let random_seed = u64::from_le_bytes(seed);

        let plies_bytes = &payload[FIELDS_SIZE..];
        let expected_len = num_plies
            .checked_mul(PLY_SIZE)
            .ok_or(RecordError::Truncated("plies"))?;
        if plies_bytes.len() < expected_len {
            return Err(RecordError::Truncated("plies"));
        }
        if plies_bytes.len() > expected_len {
            return Err(RecordError::TrailingBytes);
        }

        let mut plies = Vec::with_capacity(num_plies);
        for (index, chunk) in plies_bytes.chunks_exact(PLY_SIZE).enumerate() {
            let color = match chunk[0] {
                COLOR_BLACK => Color::Black,
                COLOR_WHITE => Color::White,
                value => {
                    return Err(RecordError::InvalidPly {
                        index,
                        field: "color",
                        value,
                    });
                }
            };
            let mv = match chunk[1] {
                PASS_CODE => Move::Pass,
                RESIGN_CODE if index + 1 == num_plies => Move::Resign,
                RESIGN_CODE => {
                    return Err(RecordError::InvalidPly {
                        index,
                        field: "resign",
                        value: RESIGN_CODE,
                    });
                }
                code => Point::from_index(code as usize)
                    .map(Move::Play)
                    .ok_or(RecordError::InvalidPly {
                        index,
                        field: "point",
                        value: code,
                    })?,
            };
            plies.push(Ply { color, mv });
        }

        Ok(Self {
            header: RecordHeader {
                board_size,
                komi,
                handicap,
                ruleset,
                level,
                random_seed,
            },
            plies,
        })
    }

    /// Exports the record as an SGF game tree.
    pub fn to_sgf(&self) -> String {
        let header = &self.header;
        let mut sgf = format!(
            "(;GM[1]FF[4]SZ[{}]KM[{}]HA[{}]RU[{}]",
            header.board_size,
            header.komi,
            header.handicap,
            header.ruleset.sgf_name()
        );
        let stones = handicap_points(header.handicap);
        if !stones.is_empty() {
            sgf.push_str("AB");
            for point in stones {
                let _ = write!(sgf, "[{}]", sgf_point(point));
            }
        }
        if let Some(Ply {
            color,
            mv: Move::Resign,
        }) = self.plies.last()
        {
            let winner = match color.opponent() {
                Color::Black => 'B',
                Color::White => 'W',
            };
            let _ = write!(sgf, "RE[{winner}+R]");
        }
        for ply in &self.plies {
            let tag = match ply.color {
                Color::Black => 'B',
                Color::White => 'W',
            };
            match ply.mv {
                Move::Play(point) => {
                    let _ = write!(sgf, ";{tag}[{}]", sgf_point(point));
                }
                Move::Pass => {
                    let _ = write!(sgf, ";{tag}[]");
                }
                Move::Resign => {}
            }
        }
        sgf.push(')');
        sgf
    }
}

/// Owns the in-memory record and the last fully built serialized buffer.
#[derive(Debug)]
pub struct RecordManager {
    record: MoveRecord,
    buffer: Arc<[u8]>,
}

impl RecordManager {
    pub fn new(header: RecordHeader) -> Self {
        Self::from_record(MoveRecord::new(header))
    }

    pub fn from_record(record: MoveRecord) -> Self {
        let buffer = Arc::from(record.encode());
        Self { record, buffer }
    }

    pub fn append(&mut self, ply: Ply) {
        self.record.plies.push(ply);
    }

    /// Serializes the whole record. The previous buffer is swapped out only
    /// once the new one is complete; readers holding it keep a valid copy.
    pub fn regenerate(&mut self) -> Arc<[u8]> {
        let fresh: Arc<[u8]> = Arc::from(self.record.encode());
        self.buffer = Arc::clone(&fresh);
        fresh
    }

    /// Last regenerated buffer.
    pub fn buffer(&self) -> Arc<[u8]> {
        Arc::clone(&self.buffer)
    }

    pub fn record(&self) -> &MoveRecord {
        &self.record
    }

    /// Writes the last regenerated buffer to `path` via a sibling temp
    /// file, so a crash mid-write leaves the previous file intact.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let tmp = temp_path(path);
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&self.buffer)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        info!(
            path = %path.display(),
            plies = self.record.len(),
            bytes = self.buffer.len(),
            "record persisted"
        );
        Ok(())
    }

    /// Loads a previously persisted record. A missing, empty, or corrupt
    /// file yields `None`.
    pub fn resume(path: &Path) -> Option<MoveRecord> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no prior record");
                return None;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read prior record");
                return None;
            }
        };
        debug!(path = %path.display(), bytes = data.len(), "prior record read");
        Self::resume_bytes(&data)
    }

    /// Decodes a record handed over in memory. Empty or corrupt bytes
    /// yield `None`.
    pub fn resume_bytes(data: &[u8]) -> Option<MoveRecord> {
        if data.is_empty() {
            debug!("prior record is empty");
            return None;
        }
        match MoveRecord::decode(data) {
            Ok(record) => {
                info!(plies = record.len(), "prior record loaded");
                Some(record)
            }
            Err(err) => {
                warn!(error = %err, "prior record is invalid");
                None
            }
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn sgf_point(point: Point) -> String {
    let col = (b'a' + point.col) as char;
    let row = (b'a' + point.row) as char;
    format!("{col}{row}")
}

fn read_u32_le(data: &[u8], offset: usize) -> std::result::Result<u32, RecordError> {
    if offset + 4 > data.len() {
        return Err(RecordError::Truncated("u32"));
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    Ok(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ply(color: Color, mv: &str) -> Ply {
        Ply {
            color,
            mv: mv.parse().unwrap(),
        }
    }

    fn sample_record() -> MoveRecord {
        MoveRecord {
            header: RecordHeader {
                komi: 6.5,
                level: 3,
                random_seed: 99,
                ..RecordHeader::default()
            },
            plies: vec![
                ply(Color::Black, "C3"),
                ply(Color::White, "pass"),
                ply(Color::Black, "resign"),
            ],
        }
    }

    fn reseal(bytes: &mut [u8]) {
        let crc = crc32fast::hash(&bytes[HEADER_SIZE..]);
        bytes[12..16].copy_from_slice(&crc.to_le_bytes());
    }

    #[test]
    fn decode_restores_header_and_plies() {
        let record = sample_record();
        let decoded = MoveRecord::decode(&record.encode()).expect("must decode");
        assert_eq!(decoded, record);
    }

    #[test]
    fn decode_rejects_invalid_magic() {
        let mut bytes = sample_record().encode();
        bytes[0] = b'X';
        assert_eq!(MoveRecord::decode(&bytes), Err(RecordError::Magic));
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let mut bytes = sample_record().encode();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            MoveRecord::decode(&bytes),
            Err(RecordError::Version { actual: 2, .. })
        ));
    }

    #[test]
    fn decode_rejects_crc_mismatch() {
        let mut bytes = sample_record().encode();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            MoveRecord::decode(&bytes),
            Err(RecordError::Checksum { .. })
        ));
    }

    #[test]
    fn decode_rejects_truncated_plies_and_trailing_bytes() {
        let mut truncated = sample_record().encode();
        truncated.pop();
        reseal(&mut truncated);
        assert_eq!(
            MoveRecord::decode(&truncated),
            Err(RecordError::Truncated("plies"))
        );

        let mut trailing = sample_record().encode();
        trailing.push(0);
        reseal(&mut trailing);
        assert_eq!(
            MoveRecord::decode(&trailing),
            Err(RecordError::TrailingBytes)
        );
    }

    #[test]
    fn decode_rejects_resign_before_last_ply() {
        let record = MoveRecord {
            header: RecordHeader::default(),
            plies: vec![ply(Color::Black, "resign"), ply(Color::White, "pass")],
        };
        assert!(matches!(
            MoveRecord::decode(&record.encode()),
            Err(RecordError::InvalidPly {
                index: 0,
                field: "resign",
                ..
            })
        ));
    }

    #[test]
    fn decode_rejects_short_input() {
        assert!(matches!(
            MoveRecord::decode(b"GREC"),
            Err(RecordError::TooShort { actual: 4, .. })
        ));
    }

    #[test]
    fn regenerate_keeps_previous_buffer_alive_for_readers() {
        let mut manager = RecordManager::new(RecordHeader::default());
        let before = manager.buffer();

        manager.append(ply(Color::Black, "E5"));
        let after = manager.regenerate();

        assert_eq!(MoveRecord::decode(&before).unwrap().len(), 0);
        assert_eq!(MoveRecord::decode(&after).unwrap().len(), 1);
        assert_eq!(manager.buffer(), after);
    }

    #[test]
    fn persist_then_resume_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.grec");
        let mut manager = RecordManager::from_record(sample_record());
        manager.regenerate();

        manager.persist(&path).unwrap();

        assert_eq!(RecordManager::resume(&path), Some(sample_record()));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn resume_treats_missing_empty_and_corrupt_files_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.grec");
        let empty = dir.path().join("empty.grec");
        let corrupt = dir.path().join("corrupt.grec");
        fs::write(&empty, b"").unwrap();
        fs::write(&corrupt, b"definitely not a record").unwrap();

        assert_eq!(RecordManager::resume(&missing), None);
        assert_eq!(RecordManager::resume(&empty), None);
        assert_eq!(RecordManager::resume(&corrupt), None);
    }

    #[test]
    fn resume_bytes_treats_empty_and_corrupt_input_as_absent() {
        assert_eq!(RecordManager::resume_bytes(b""), None);
        assert_eq!(RecordManager::resume_bytes(b"GREC but not a record"), None);
        assert_eq!(
            RecordManager::resume_bytes(&sample_record().encode()),
            Some(sample_record())
        );
    }

    #[test]
    fn sgf_export_lists_handicap_moves_and_result() {
        let mut record = sample_record();
        record.header.handicap = 2;

        let sgf = record.to_sgf();

        assert!(sgf.starts_with("(;GM[1]FF[4]SZ[9]KM[6.5]HA[2]RU[Chinese]AB[gc][cg]"));
        assert!(sgf.contains("RE[W+R]"));
        assert!(sgf.ends_with(";B[cg];W[])"));
    }
}
