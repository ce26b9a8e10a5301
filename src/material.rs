//! The two shared surface materials and their named uniform slots.
//!
//! Materials are singletons: [`wireframe()`] and [`sphere()`] build their
//! material the first time they are called on a thread and hand out clones
//! of the same [`SharedMaterial`] afterwards. Scene objects hold these
//! references; the frame loop mutates the sphere's uniforms through them.
//!
//! Slot names follow the shader: `u_` for values, `t_` for textures.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec3, Vec4};

use crate::error::MaterialError;
use crate::texture::TextureHandle;

pub const U_EFFECT_ORIGIN: &str = "u_effect_origin";
pub const U_TIME: &str = "u_time";
pub const T_NOISE: &str = "t_noise";
pub const T_MATCAP: &str = "t_matcap";

/// Shared, single-thread handle to a material.
pub type SharedMaterial = Rc<RefCell<Material>>;

/// A value stored in a uniform slot.
#[derive(Clone, Debug)]
pub enum UniformValue {
    Scalar(f32),
    Vector3(Vec3),
    Texture(Option<TextureHandle>),
}

/// Uniforms of the sphere shader.
#[derive(Clone, Debug, Default)]
pub struct SphereUniforms {
    pub effect_origin: Vec3,
    pub time: f32,
    pub noise: Option<TextureHandle>,
    pub matcap: Option<TextureHandle>,
}

/// GPU layout of the sphere's value uniforms. Textures bind separately.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereUniformsRaw {
    pub effect_origin: [f32; 3],
    pub time: f32,
}

impl From<&SphereUniforms> for SphereUniformsRaw {
    fn from(u: &SphereUniforms) -> Self {
        Self {
            effect_origin: u.effect_origin.to_array(),
            time: u.time,
        }
    }
}

/// A surface material.
#[derive(Clone, Debug)]
pub enum Material {
    /// Unlit edge lines in a single colour. Nothing here changes per frame.
    Wireframe { color: Vec4 },
    /// Transparent, double-sided, matcap-shaded sphere driven by time and
    /// the effect origin.
    Sphere(SphereUniforms),
}

impl Material {
    pub fn name(&self) -> &'static str {
        match self {
            Material::Wireframe { .. } => "wireframe",
            Material::Sphere(_) => "sphere",
        }
    }

    /// Names of every uniform slot this material exposes.
    pub fn slots(&self) -> &'static [&'static str] {
        match self {
            Material::Wireframe { .. } => &[],
            Material::Sphere(_) => &[U_EFFECT_ORIGIN, U_TIME, T_NOISE, T_MATCAP],
        }
    }

    /// Read a named uniform slot.
    pub fn uniform(&self, slot: &str) -> Option<UniformValue> {
        let Material::Sphere(u) = self else {
            return None;
        };
        match slot {
            U_EFFECT_ORIGIN => Some(UniformValue::Vector3(u.effect_origin)),
            U_TIME => Some(UniformValue::Scalar(u.time)),
            T_NOISE => Some(UniformValue::Texture(u.noise.clone())),
            T_MATCAP => Some(UniformValue::Texture(u.matcap.clone())),
            _ => None,
        }
    }

    /// Write a named uniform slot, checking the value's type.
    pub fn set_uniform(&mut self, slot: &str, value: UniformValue) -> Result<(), MaterialError> {
        let material = self.name();
        let Material::Sphere(u) = self else {
            return Err(MaterialError::UnknownSlot {
                material,
                slot: slot.to_string(),
            });
        };
        match (slot, value) {
            (U_EFFECT_ORIGIN, UniformValue::Vector3(v)) => u.effect_origin = v,
            (U_TIME, UniformValue::Scalar(t)) => u.time = t,
            (T_NOISE, UniformValue::Texture(t)) => u.noise = t,
            (T_MATCAP, UniformValue::Texture(t)) => u.matcap = t,
            (U_EFFECT_ORIGIN, _) => return Err(mismatch(U_EFFECT_ORIGIN, "vector3")),
            (U_TIME, _) => return Err(mismatch(U_TIME, "scalar")),
            (T_NOISE, _) => return Err(mismatch(T_NOISE, "texture")),
            (T_MATCAP, _) => return Err(mismatch(T_MATCAP, "texture")),
            (other, _) => {
                return Err(MaterialError::UnknownSlot {
                    material,
                    slot: other.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn as_sphere(&self) -> Option<&SphereUniforms> {
        match self {
            Material::Sphere(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_sphere_mut(&mut self) -> Option<&mut SphereUniforms> {
        match self {
            Material::Sphere(u) => Some(u),
            _ => None,
        }
    }
}

fn mismatch(slot: &'static str, expected: &'static str) -> MaterialError {
    MaterialError::TypeMismatch { slot, expected }
}

thread_local! {
    static WIREFRAME: SharedMaterial = Rc::new(RefCell::new(Material::Wireframe {
        color: Vec4::new(1.0, 1.0, 1.0, 1.0),
    }));
    static SPHERE: SharedMaterial =
        Rc::new(RefCell::new(Material::Sphere(SphereUniforms::default())));
}

/// The shared wireframe material.
pub fn wireframe() -> SharedMaterial {
    WIREFRAME.with(Rc::clone)
}

/// The shared sphere material. Texture slots start empty.
pub fn sphere() -> SharedMaterial {
    SPHERE.with(Rc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_are_shared() {
        assert!(Rc::ptr_eq(&sphere(), &sphere()));
        assert!(Rc::ptr_eq(&wireframe(), &wireframe()));
        assert!(!Rc::ptr_eq(&sphere(), &wireframe()));
    }

    #[test]
    fn sphere_slots_round_trip_through_names() {
        let mut m = Material::Sphere(SphereUniforms::default());
        m.set_uniform(U_TIME, UniformValue::Scalar(2.5)).unwrap();
        m.set_uniform(U_EFFECT_ORIGIN, UniformValue::Vector3(Vec3::Y))
            .unwrap();

        assert!(matches!(m.uniform(U_TIME), Some(UniformValue::Scalar(t)) if t == 2.5));
        assert!(matches!(
            m.uniform(U_EFFECT_ORIGIN),
            Some(UniformValue::Vector3(v)) if v == Vec3::Y
        ));
        assert!(matches!(m.uniform(T_NOISE), Some(UniformValue::Texture(None))));
        assert_eq!(m.slots().len(), 4);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut m = Material::Sphere(SphereUniforms::default());
        let err = m
            .set_uniform(U_TIME, UniformValue::Vector3(Vec3::ONE))
            .unwrap_err();
        assert_eq!(
            err,
            MaterialError::TypeMismatch {
                slot: U_TIME,
                expected: "scalar"
            }
        );
    }

    #[test]
    fn wireframe_has_no_slots() {
        let mut m = Material::Wireframe { color: Vec4::ONE };
        assert!(m.slots().is_empty());
        assert!(m.uniform(U_TIME).is_none());
        assert!(matches!(
            m.set_uniform(U_TIME, UniformValue::Scalar(1.0)),
            Err(MaterialError::UnknownSlot { material: "wireframe", .. })
        ));
    }

    #[test]
    fn raw_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<SphereUniformsRaw>(), 16);
    }
}
