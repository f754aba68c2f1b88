//! Version 1 field metadata: simulation setup, X-ray tube, producing software and
//! free-form dynamic entries.
use glam::{Vec2, Vec3};
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::metadata::dynamic::{DynamicValue, FromDynamic};
use crate::metadata::spectrum::Spectrum;

/// Shape of the radiation field leaving the tube.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldShape {
    Cone { opening_angle_deg: f32 },
    Rectangle { dimensions_m: Vec2 },
    Ellipsis { opening_angles_deg: Vec2 },
}

impl Default for FieldShape {
    fn default() -> Self {
        FieldShape::Cone {
            opening_angle_deg: 0.0,
        }
    }
}

impl FieldShape {
    pub(crate) fn tag(&self) -> u8 {
        match self {
            FieldShape::Cone { .. } => 0,
            FieldShape::Rectangle { .. } => 1,
            FieldShape::Ellipsis { .. } => 2,
        }
    }
}

/// X-ray tube emitting the simulated radiation.
///
/// The maximum energy and the spectrum are validated together: a spectrum can only be
/// assigned once the maximum energy is known and must stay below it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TubeRepr", into = "TubeRepr"))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tube {
    pub radiation_origin: Vec3,
    pub radiation_direction: Vec3,
    pub tube_id: String,
    pub field_shape: FieldShape,
    max_energy_ev: Option<f32>,
    spectrum: Option<Spectrum>,
}

impl Tube {
    pub fn max_energy_ev(&self) -> Option<f32> {
        self.max_energy_ev
    }

    pub fn set_max_energy_ev(&mut self, max_energy_ev: f32) -> Result<()> {
        if !(max_energy_ev.is_finite() && max_energy_ev > 0.0) {
            return Err(Error::Validation(format!(
                "max energy must be > 0 eV, got {max_energy_ev}"
            )));
        }
        if let Some(spectrum) = &self.spectrum {
            if spectrum.max_energy_ev() > max_energy_ev {
                return Err(Error::Validation(format!(
                    "max energy {max_energy_ev} eV is below the assigned spectrum reaching {} eV",
                    spectrum.max_energy_ev()
                )));
            }
        }
        self.max_energy_ev = Some(max_energy_ev);
        Ok(())
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    pub fn set_spectrum(&mut self, spectrum: Spectrum) -> Result<()> {
        let Some(max) = self.max_energy_ev else {
            return Err(Error::Validation(
                "set the tube max energy before assigning a spectrum".into(),
            ));
        };
        if spectrum.max_energy_ev() > max {
            return Err(Error::Validation(format!(
                "spectrum reaches {} eV, above the tube max energy of {max} eV",
                spectrum.max_energy_ev()
            )));
        }
        self.spectrum = Some(spectrum);
        Ok(())
    }

    pub fn clear_spectrum(&mut self) -> Option<Spectrum> {
        self.spectrum.take()
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct TubeRepr {
    radiation_origin: Vec3,
    radiation_direction: Vec3,
    tube_id: String,
    field_shape: FieldShape,
    max_energy_ev: Option<f32>,
    spectrum: Option<Spectrum>,
}

#[cfg(feature = "serde")]
impl TryFrom<TubeRepr> for Tube {
    type Error = Error;

    fn try_from(repr: TubeRepr) -> Result<Self> {
        let mut tube = Tube {
            radiation_origin: repr.radiation_origin,
            radiation_direction: repr.radiation_direction,
            tube_id: repr.tube_id,
            field_shape: repr.field_shape,
            max_energy_ev: None,
            spectrum: None,
        };
        if let Some(max) = repr.max_energy_ev {
            tube.set_max_energy_ev(max)?;
        }
        if let Some(spectrum) = repr.spectrum {
            tube.set_spectrum(spectrum)?;
        }
        Ok(tube)
    }
}

#[cfg(feature = "serde")]
impl From<Tube> for TubeRepr {
    fn from(tube: Tube) -> Self {
        TubeRepr {
            radiation_origin: tube.radiation_origin,
            radiation_direction: tube.radiation_direction,
            tube_id: tube.tube_id,
            field_shape: tube.field_shape,
            max_energy_ev: tube.max_energy_ev,
            spectrum: tube.spectrum,
        }
    }
}

/// Monte Carlo setup the field was produced with.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Simulation {
    pub primary_particle_count: u64,
    pub geometry: String,
    pub physics_list: String,
    pub tube: Tube,
}

/// Software that wrote the field.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Software {
    pub name: String,
    pub version: String,
    pub repository: String,
    pub commit: String,
}

impl Default for Software {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            repository: String::new(),
            commit: String::new(),
        }
    }
}

/// Metadata stored alongside a field.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub simulation: Simulation,
    pub software: Software,
    #[cfg_attr(feature = "serde", serde(default))]
    dynamic: IndexMap<String, DynamicValue>,
}

impl Metadata {
    pub fn new(simulation: Simulation, software: Software) -> Self {
        Self {
            simulation,
            software,
            dynamic: IndexMap::new(),
        }
    }

    /// Dynamic keys in insertion order.
    pub fn dynamic_keys(&self) -> impl Iterator<Item = &str> {
        self.dynamic.keys().map(String::as_str)
    }

    pub fn dynamic_entries(&self) -> impl Iterator<Item = (&str, &DynamicValue)> {
        self.dynamic.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn has_dynamic(&self, key: &str) -> bool {
        self.dynamic.contains_key(key)
    }

    pub fn get_dynamic(&self, key: &str) -> Result<&DynamicValue> {
        self.dynamic
            .get(key)
            .ok_or_else(|| Error::not_found("metadata key", key))
    }

    /// Typed read of a dynamic entry.
    pub fn get_dynamic_as<T: FromDynamic>(&self, key: &str) -> Result<T> {
        let value = self.get_dynamic(key)?;
        T::from_dynamic(value).ok_or_else(|| Error::MetadataTypeMismatch {
            key: key.to_owned(),
            expected: T::TYPE_NAME,
            found: value.type_name(),
        })
    }

    /// Sets a dynamic entry, replacing (and returning) any previous value.
    pub fn set_dynamic(
        &mut self,
        key: impl Into<String>,
        value: impl Into<DynamicValue>,
    ) -> Option<DynamicValue> {
        let key = key.into();
        let previous = self.dynamic.insert(key.clone(), value.into());
        if let Some(previous) = &previous {
            warn!(key = %key, previous = %previous, "overwrote dynamic metadata");
        }
        previous
    }

    pub fn remove_dynamic(&mut self, key: &str) -> Result<DynamicValue> {
        self.dynamic
            .shift_remove(key)
            .ok_or_else(|| Error::not_found("metadata key", key))
    }
}
