//! Serde helpers for glam types.
//!
//! glam is built without its `serde` feature, so vector fields in events and
//! footprints go through these `{x, y[, z]}` proxies via
//! `#[serde(serialize_with = ..., deserialize_with = ...)]`.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field-named stand-in for a world-space `Vec3` (settle and replay positions).
#[derive(Serialize, Deserialize)]
pub struct Vec3Def {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vec3Def {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Def> for Vec3 {
    fn from(def: Vec3Def) -> Self {
        Vec3::new(def.x, def.y, def.z)
    }
}

pub fn serialize_vec3<S>(v: &Vec3, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Vec3Def::from(*v).serialize(s)
}

pub fn deserialize_vec3<'de, D>(d: D) -> Result<Vec3, D::Error>
where
    D: Deserializer<'de>,
{
    Vec3Def::deserialize(d).map(Vec3::from)
}

/// Field-named stand-in for a footprint corner `Vec2`.
#[derive(Serialize, Deserialize)]
pub struct Vec2Def {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Vec2Def {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vec2Def> for Vec2 {
    fn from(def: Vec2Def) -> Self {
        Vec2::new(def.x, def.y)
    }
}

pub fn serialize_vec2<S>(v: &Vec2, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Vec2Def::from(*v).serialize(s)
}

pub fn deserialize_vec2<'de, D>(d: D) -> Result<Vec2, D::Error>
where
    D: Deserializer<'de>,
{
    Vec2Def::deserialize(d).map(Vec2::from)
}
