//! CSV file of recorded fixes

use std::io::Read;

use csv::{Reader, StringRecord};
use serde::Deserialize;
use time::format_description::well_known;
use time::OffsetDateTime;

use crate::error::NavError;
use crate::navigation::position::split_pair;
use crate::{Coordinate, Position};

/// Column names of a fixes file
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldsBuilder {
    pub coordinates: String,
    pub time: String,
    pub accuracy: String,
    /// Coordinates stored as `lat,lng` instead of `lng,lat`
    pub flip_coordinates: bool,
}

impl Default for FieldsBuilder {
    fn default() -> Self {
        Self {
            coordinates: "coordinates".to_string(),
            time: "time".to_string(),
            accuracy: "accuracy".to_string(),
            flip_coordinates: false,
        }
    }
}

impl FieldsBuilder {
    pub fn coordinates(mut self, name: &str) -> Self {
        self.coordinates = name.to_lowercase();
        self
    }

    pub fn time(mut self, name: &str) -> Self {
        self.time = name.to_lowercase();
        self
    }

    pub fn accuracy(mut self, name: &str) -> Self {
        self.accuracy = name.to_lowercase();
        self
    }

    pub fn flip(mut self, flip: bool) -> Self {
        self.flip_coordinates = flip;
        self
    }

    pub fn done(self) -> Self {
        self
    }
}

/// Recorded fixes, replayed through a [`super::ManualSource`]
pub struct CsvSource<T>
where
    T: Read,
{
    rdr: Reader<T>,
    fields: FieldsBuilder,
}

impl<T> CsvSource<T>
where
    T: Read,
{
    pub fn new(rdr: Reader<T>, fields: Option<FieldsBuilder>) -> Self {
        Self {
            rdr,
            fields: fields.unwrap_or_default(),
        }
    }

    /// Every usable fix of the file, oldest first
    pub fn fetch(&mut self) -> Result<Vec<Position>, NavError> {
        let mut pos = vec![];

        let mut header = self
            .rdr
            .headers()
            .map_err(|e| NavError::Source(format!("Failed on read the header: {}", e)))?
            .clone();
        let header_idx = parse_header(&self.fields, &mut header)?;

        for row in self.rdr.records() {
            let mut rec = row.map_err(|e| NavError::Source(format!("Failed on read some row: {}", e)))?;

            if rec.len() < 2 {
                continue;
            }

            let row_pos = parse_row(&header_idx, &self.fields, &mut rec)
                .map_err(|e| NavError::Source(format!("Error with row {:?}: {}", rec, e)))?;

            if let Some(p) = row_pos {
                pos.push(p);
            }
        }

        pos.sort_by_key(|p| p.time);

        Ok(pos)
    }
}

/// Field to index map
#[derive(Debug)]
struct FieldsIndex {
    coordinates: usize,
    time: usize,
    accuracy: Option<usize>,
}

fn parse_header(fields: &FieldsBuilder, header: &mut StringRecord) -> Result<FieldsIndex, NavError> {
    header.trim();

    let position = |name: &str| header.iter().position(|h| h.to_lowercase() == name);

    let coordinates = position(&fields.coordinates)
        .ok_or_else(|| NavError::Source("Coordinates header not found".to_string()))?;
    let time = position(&fields.time)
        .ok_or_else(|| NavError::Source("Time header not found".to_string()))?;
    let accuracy = position(&fields.accuracy);

    Ok(FieldsIndex {
        coordinates,
        time,
        accuracy,
    })
}

fn parse_row(
    header: &FieldsIndex,
    fields: &FieldsBuilder,
    row: &mut StringRecord,
) -> Result<Option<Position>, String> {
    row.trim();

    let raw_coordinates = row
        .get(header.coordinates)
        .ok_or("Coordinates field not found")?;

    let (first, second) = match split_pair(raw_coordinates) {
        Some(pair) => pair,
        None => return Ok(None),
    };
    let coordinate = if fields.flip_coordinates {
        Coordinate::new(first, second)
    } else {
        Coordinate::new(second, first)
    };
    if !coordinate.is_valid() {
        return Ok(None);
    }

    let time = match row.get(header.time) {
        Some(d) => OffsetDateTime::parse(d, &well_known::Rfc3339)
            .map_err(|e| format!("Failed on parse the time: {}", e)),
        None => Err("Time field not found".to_string()),
    }?;

    let mut position = Position::basic(coordinate, time);

    if let Some(iaccuracy) = header.accuracy {
        position.accuracy = row.get(iaccuracy).and_then(|d| d.parse::<f64>().ok());
    }

    Ok(Some(position))
}
