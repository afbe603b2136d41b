// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Headless frame output: one JSON object per update cycle.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use radar_scope::{RadarTransform, ScopeFrame, ScreenVec};
use serde::Serialize;

/// One emitted frame with the view state it was drawn with.
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub cycle: u64,
    pub generated_at: DateTime<Utc>,
    pub tracon: &'a str,
    pub scale: f64,
    pub pan_offset: ScreenVec,
    #[serde(flatten)]
    pub frame: &'a ScopeFrame,
}

impl<'a> FrameRecord<'a> {
    pub fn new(cycle: u64, tracon: &'a str, view: &RadarTransform, frame: &'a ScopeFrame) -> Self {
        Self {
            cycle,
            generated_at: Utc::now(),
            tracon,
            scale: view.scale(),
            pan_offset: view.pan_offset(),
            frame,
        }
    }
}

/// Writes frame records as JSON lines.
pub struct FrameWriter<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write(&mut self, record: &FrameRecord<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_scope::{GeoPoint, RawReport, Scope};

    #[test]
    fn test_writes_one_line_per_frame() {
        let scope = Scope::default();
        scope.ingest(&[RawReport::at("UAL9", 41.98, -87.90)
            .with_altitude(4_200.0)
            .with_velocity(180.0, 270.0)]);
        let view = RadarTransform::new(GeoPoint::new(41.9786, -87.9048), 1.0, ScreenVec::new(700.0, 400.0));
        let frame = scope.frame(&view);

        let mut writer = FrameWriter::new(Vec::new());
        writer.write(&FrameRecord::new(1, "C90", &view, &frame)).unwrap();
        writer.write(&FrameRecord::new(2, "C90", &view, &frame)).unwrap();
        assert_eq!(writer.written(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["cycle"], 2);
        assert_eq!(value["tracon"], "C90");
        assert_eq!(value["range_rings"].as_array().unwrap().len(), 9);
        assert_eq!(value["blips"][0]["id"], "UAL9");
        assert_eq!(value["blips"][0]["data_block"]["detail"], "042 180");
        assert_eq!(value["blips"][0]["sector"], "F");
        assert!(value["generated_at"].is_string());
    }
}
