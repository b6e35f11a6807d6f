//! BVH text writer
//!
//! # Layout
//! ```text
//! HIERARCHY
//! ROOT <name>
//! {
//!     OFFSET <x> <y> <z>
//!     CHANNELS 6 Xposition Yposition Zposition Yrotation Xrotation Zrotation
//!     JOINT <name>
//!     {
//!         OFFSET 0 <distance to parent> 0
//!         CHANNELS 3 Yrotation Xrotation Zrotation
//!         End Site
//!         {
//!             OFFSET <x> <y> <z>
//!         }
//!     }
//! }
//! MOTION
//! Frames: <n>
//! Frame Time: <seconds>
//! <n rows of channel values>
//! ```
//!
//! Joint offsets are collapsed onto the Y axis. A non-axis-aligned joint
//! offset makes importers such as Blender derive a rest rotation for the
//! joint, which then skews every rotation channel written against it.

use std::io::{self, Write};

use glam::Vec3;

use crate::convert::{CoordinateConverter, format_vec3, push_number};
use crate::hierarchy::{BoneId, BoneKind, Skeleton};
use crate::sampler::FrameSample;

const INDENT: &str = "    ";
const ROOT_CHANNELS: &str = "CHANNELS 6 Xposition Yposition Zposition Yrotation Xrotation Zrotation";
const JOINT_CHANNELS: &str = "CHANNELS 3 Yrotation Xrotation Zrotation";
/// Mixed-case spelling of the terminal block keyword. BVH readers match it
/// case-insensitively, so this is equivalent to `END SITE`.
pub const END_SITE_KEYWORD: &str = "End Site";

pub struct BvhWriter<W: Write> {
    out: W,
    converter: CoordinateConverter,
    rows: usize,
}

impl<W: Write> BvhWriter<W> {
    pub fn new(out: W, converter: CoordinateConverter) -> Self {
        Self {
            out,
            converter,
            rows: 0,
        }
    }

    /// Motion rows written so far
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write_hierarchy(&mut self, skeleton: &Skeleton) -> io::Result<()> {
        writeln!(self.out, "HIERARCHY")?;
        self.write_bone(skeleton, skeleton.root(), 0)
    }

    fn write_bone(&mut self, skeleton: &Skeleton, id: BoneId, level: usize) -> io::Result<()> {
        let bone = skeleton.bone(id);
        let pad = INDENT.repeat(level);

        let (keyword, offset, channels) = match bone.kind {
            BoneKind::Root => (
                format!("ROOT {}", bone.name),
                self.converter.position(bone.rest_offset),
                Some(ROOT_CHANNELS),
            ),
            BoneKind::Joint => (
                format!("JOINT {}", bone.name),
                Vec3::new(0.0, bone.rest_offset.length(), 0.0),
                Some(JOINT_CHANNELS),
            ),
            BoneKind::EndSite => (
                END_SITE_KEYWORD.to_string(),
                self.converter.position(bone.rest_offset),
                None,
            ),
        };

        writeln!(self.out, "{pad}{keyword}")?;
        writeln!(self.out, "{pad}{{")?;
        writeln!(self.out, "{pad}{INDENT}OFFSET {}", format_vec3(offset))?;
        if let Some(channels) = channels {
            writeln!(self.out, "{pad}{INDENT}{channels}")?;
        }
        for &child in &bone.children {
            self.write_bone(skeleton, child, level + 1)?;
        }
        writeln!(self.out, "{pad}}}")
    }

    pub fn write_motion_header(&mut self, frame_count: usize, frame_time: f64) -> io::Result<()> {
        writeln!(self.out, "MOTION")?;
        writeln!(self.out, "Frames: {}", frame_count)?;
        writeln!(self.out, "Frame Time: {:.8}", frame_time)
    }

    pub fn write_frame(&mut self, frame: &FrameSample) -> io::Result<()> {
        let mut line = String::with_capacity(frame.len() * 12);
        for (i, &value) in frame.values().iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            push_number(&mut line, value);
        }
        writeln!(self.out, "{}", line)?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
