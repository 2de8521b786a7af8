//! # Solar-wind dispersion component
//!
//! One component, [`SolarWind`], parameterized by a geometry strategy:
//!
//! - [`SolarWindModel::Spherical`] — the classic 1/r² wind with a single
//!   density amplitude `NE_SW` and the closed trigonometric path length
//!   (Edwards et al. 2006, section 2.5.4).
//! - [`SolarWindModel::PowerLaw`] — general radial index `SWP`, both the
//!   amplitude and the index fittable (You et al. 2012; Hazboun et al. 2022).
//! - [`SolarWindModel::Scaled`] — same geometry, but the fitted amplitude is
//!   the maximum DM at the fiducial elongation (the pulsar's ecliptic
//!   latitude) instead of a density.
//! - [`SolarWindModel::Segmented`] — an independent amplitude/index pair per
//!   time range, managed by a [`SegmentSet`].
//!
//! The component owns an explicit derivative table mapping parameter names to
//! the quantity being differentiated; it is rebuilt by `setup()` after every
//! structural mutation, and queries refuse to run on a model whose last
//! mutation failed validation.

pub mod geometry;
pub mod segments;
pub mod special;

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::constants::{Dm, Radian, Sec, MJD};
use crate::context::PulsarContext;
use crate::dispersion::{d_dm_to_d_delay, dedispersion_freqs, dm_to_delay};
use crate::params::{split_prefixed_name, Param};
use crate::select::get_select_index;
use crate::timing_errors::TimingError;
use crate::toas::Toas;

use geometry::{
    d_power_law_geometry_d_p, d_power_law_geometry_d_p_one, power_law_geometry,
    power_law_geometry_one, spherical_geometry, spherical_geometry_one,
};
pub use segments::{MergeValue, SegmentSet, SwxSegment};

/// Geometry strategy and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum SolarWindModel {
    Spherical { ne_sw: Param },
    PowerLaw { ne_sw: Param, p: Param },
    Scaled { dm_max: Param, p: Param },
    Segmented { segments: SegmentSet },
}

/// What a registered parameter differentiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DerivKind {
    NeSw,
    PowerIndex,
    DmMax,
    SegmentValue(u16),
    SegmentPower(u16),
}

/// The solar-wind delay component.
#[derive(Debug, Clone)]
pub struct SolarWind {
    model: SolarWindModel,
    deriv_table: BTreeMap<String, DerivKind>,
    validated: bool,
}

impl SolarWind {
    /// Spherical 1/r² wind with density `ne_sw` (cm⁻³) at 1 AU.
    pub fn new_spherical(ne_sw: f64) -> Self {
        let mut sw = SolarWind {
            model: SolarWindModel::Spherical {
                ne_sw: Param::new("NE_SW", ne_sw, true),
            },
            deriv_table: BTreeMap::new(),
            validated: true,
        };
        sw.setup();
        sw
    }

    /// General power-law wind: density `ne_sw` (cm⁻³) at 1 AU, radial index `p`.
    pub fn new_power_law(ne_sw: f64, p: f64) -> Self {
        let mut sw = SolarWind {
            model: SolarWindModel::PowerLaw {
                ne_sw: Param::new("NE_SW", ne_sw, false),
                p: Param::new("SWP", p, false),
            },
            deriv_table: BTreeMap::new(),
            validated: true,
        };
        sw.setup();
        sw
    }

    /// Scaled power-law wind: `dm_max` (pc cm⁻³) is the DM at the fiducial
    /// elongation, radial index `p`.
    pub fn new_scaled(dm_max: f64, p: f64) -> Self {
        let mut sw = SolarWind {
            model: SolarWindModel::Scaled {
                dm_max: Param::new("SWDMMAX", dm_max, false),
                p: Param::new("SWPP", p, false),
            },
            deriv_table: BTreeMap::new(),
            validated: true,
        };
        sw.setup();
        sw
    }

    /// Segmented wind over an already-populated [`SegmentSet`]; the set is
    /// validated before the component is handed back.
    pub fn new_segmented(segments: SegmentSet) -> Result<Self, TimingError> {
        let mut sw = SolarWind {
            model: SolarWindModel::Segmented { segments },
            deriv_table: BTreeMap::new(),
            validated: false,
        };
        sw.setup();
        sw.validate()?;
        sw.validated = true;
        Ok(sw)
    }

    pub fn model(&self) -> &SolarWindModel {
        &self.model
    }

    /// Rebuild the derivative table from the current parameter layout.
    fn setup(&mut self) {
        self.deriv_table.clear();
        match &self.model {
            SolarWindModel::Spherical { ne_sw } => {
                self.deriv_table
                    .insert(ne_sw.name().to_string(), DerivKind::NeSw);
            }
            SolarWindModel::PowerLaw { ne_sw, p } => {
                self.deriv_table
                    .insert(ne_sw.name().to_string(), DerivKind::NeSw);
                self.deriv_table
                    .insert(p.name().to_string(), DerivKind::PowerIndex);
            }
            SolarWindModel::Scaled { dm_max, p } => {
                self.deriv_table
                    .insert(dm_max.name().to_string(), DerivKind::DmMax);
                self.deriv_table
                    .insert(p.name().to_string(), DerivKind::PowerIndex);
            }
            SolarWindModel::Segmented { segments } => {
                for (index, seg) in segments.iter() {
                    self.deriv_table
                        .insert(seg.ne_sw.name().to_string(), DerivKind::SegmentValue(index));
                    self.deriv_table
                        .insert(seg.power.name().to_string(), DerivKind::SegmentPower(index));
                }
            }
        }
    }

    /// Structural validation of the parameter layout.
    pub fn validate(&self) -> Result<(), TimingError> {
        match &self.model {
            SolarWindModel::Segmented { segments } => segments.validate(),
            _ => Ok(()),
        }
    }

    /// Check TOA coverage of every non-frozen segment (no-op for the
    /// unsegmented strategies).
    pub fn validate_against_toas(&self, toas: &Toas) -> Result<(), TimingError> {
        match &self.model {
            SolarWindModel::Segmented { segments } => segments.validate_against_toas(toas),
            _ => Ok(()),
        }
    }

    fn ensure_validated(&self) -> Result<(), TimingError> {
        if self.validated {
            Ok(())
        } else {
            Err(TimingError::NotValidated)
        }
    }

    /// Names of the parameters with registered analytic derivatives, sorted.
    pub fn deriv_params(&self) -> Vec<String> {
        self.deriv_table.keys().cloned().collect()
    }

    /// Solar-wind DM (pc cm⁻³) per TOA.
    pub fn dm(&self, ctx: &PulsarContext, toas: &Toas) -> Result<Vec<Dm>, TimingError> {
        self.ensure_validated()?;
        match &self.model {
            SolarWindModel::Spherical { ne_sw } => {
                if ne_sw.value() == 0.0 {
                    return Ok(vec![0.0; toas.len()]);
                }
                let (theta, r) = ctx.sun_angle(toas);
                Ok(spherical_geometry(&theta, &r)
                    .into_iter()
                    .map(|g| g * ne_sw.value())
                    .collect())
            }
            SolarWindModel::PowerLaw { ne_sw, p } => {
                if ne_sw.value() == 0.0 {
                    return Ok(vec![0.0; toas.len()]);
                }
                let (theta, r) = ctx.sun_angle(toas);
                Ok(power_law_geometry(&theta, &r, p.value())?
                    .into_iter()
                    .map(|g| g * ne_sw.value())
                    .collect())
            }
            SolarWindModel::Scaled { dm_max, p } => {
                let (theta, r) = ctx.sun_angle(toas);
                let fid = fiducial_geometry(ctx, p.value())?;
                Ok(power_law_geometry(&theta, &r, p.value())?
                    .into_iter()
                    .map(|g| dm_max.value() * g / fid)
                    .collect())
            }
            SolarWindModel::Segmented { segments } => {
                let mut dm = vec![0.0; toas.len()];
                let select = get_select_index(&segments.conditions(), &toas.mjds());
                for (_, seg) in segments.iter() {
                    let Some(idx) = select.get(seg.ne_sw.name()) else {
                        continue;
                    };
                    if idx.is_empty() {
                        continue;
                    }
                    let sub = toas.subset(idx);
                    let (theta, r) = ctx.sun_angle(&sub);
                    let geom = power_law_geometry(&theta, &r, seg.power.value())?;
                    for (&i, g) in idx.iter().zip(geom) {
                        dm[i] += seg.ne_sw.value() * g;
                    }
                }
                Ok(dm)
            }
        }
    }

    /// Solar-wind delay (s) per TOA, using barycentric frequencies when the
    /// context provides them.
    pub fn delay(&self, ctx: &PulsarContext, toas: &Toas) -> Result<Vec<Sec>, TimingError> {
        let dm = self.dm(ctx, toas)?;
        Ok(dm_to_delay(&dm, &dedispersion_freqs(ctx, toas)))
    }

    /// ∂DM/∂param per TOA for a registered parameter name.
    pub fn d_dm_d_param(
        &self,
        ctx: &PulsarContext,
        toas: &Toas,
        param: &str,
    ) -> Result<Vec<f64>, TimingError> {
        self.ensure_validated()?;
        let kind = *self
            .deriv_table
            .get(param)
            .ok_or_else(|| TimingError::UnknownParameter(param.to_string()))?;
        match (kind, &self.model) {
            (DerivKind::NeSw, SolarWindModel::Spherical { .. }) => {
                let (theta, r) = ctx.sun_angle(toas);
                Ok(spherical_geometry(&theta, &r))
            }
            (DerivKind::NeSw, SolarWindModel::PowerLaw { p, .. }) => {
                let (theta, r) = ctx.sun_angle(toas);
                power_law_geometry(&theta, &r, p.value())
            }
            (DerivKind::PowerIndex, SolarWindModel::PowerLaw { ne_sw, p }) => {
                let (theta, r) = ctx.sun_angle(toas);
                Ok(d_power_law_geometry_d_p(&theta, &r, p.value())?
                    .into_iter()
                    .map(|d| ne_sw.value() * d)
                    .collect())
            }
            (DerivKind::DmMax, SolarWindModel::Scaled { p, .. }) => {
                let (theta, r) = ctx.sun_angle(toas);
                let fid = fiducial_geometry(ctx, p.value())?;
                Ok(power_law_geometry(&theta, &r, p.value())?
                    .into_iter()
                    .map(|g| g / fid)
                    .collect())
            }
            (DerivKind::PowerIndex, SolarWindModel::Scaled { dm_max, p }) => {
                let (theta, r) = ctx.sun_angle(toas);
                let p = p.value();
                let fid = fiducial_geometry(ctx, p)?;
                let d_fid = d_fiducial_geometry_d_p(ctx, p)?;
                let geom = power_law_geometry(&theta, &r, p)?;
                let d_geom = d_power_law_geometry_d_p(&theta, &r, p)?;
                Ok(geom
                    .into_iter()
                    .zip(d_geom)
                    .map(|(g, dg)| dm_max.value() * (dg / fid - g / (fid * fid) * d_fid))
                    .collect())
            }
            (DerivKind::SegmentValue(index), SolarWindModel::Segmented { segments }) => {
                let seg = segments
                    .get(index)
                    .ok_or_else(|| TimingError::UnknownParameter(param.to_string()))?;
                let mut deriv = vec![0.0; toas.len()];
                for (i, g) in self.segment_geometry(ctx, toas, seg)? {
                    deriv[i] += g;
                }
                Ok(deriv)
            }
            (DerivKind::SegmentPower(index), SolarWindModel::Segmented { segments }) => {
                let seg = segments
                    .get(index)
                    .ok_or_else(|| TimingError::UnknownParameter(param.to_string()))?;
                let r = seg.range();
                let mjds = toas.mjds();
                let idx: Vec<usize> = (0..toas.len()).filter(|&i| r.contains(mjds[i])).collect();
                let mut deriv = vec![0.0; toas.len()];
                if !idx.is_empty() {
                    let sub = toas.subset(&idx);
                    let (theta, rr) = ctx.sun_angle(&sub);
                    let d_geom = d_power_law_geometry_d_p(&theta, &rr, seg.power.value())?;
                    for (&i, d) in idx.iter().zip(d_geom) {
                        deriv[i] += seg.ne_sw.value() * d;
                    }
                }
                Ok(deriv)
            }
            _ => Err(TimingError::UnknownParameter(param.to_string())),
        }
    }

    /// ∂delay/∂param per TOA; the usual `DM_CONST/f²` scaling of the DM
    /// derivative, zeroed below the minimum usable frequency.
    pub fn d_delay_d_param(
        &self,
        ctx: &PulsarContext,
        toas: &Toas,
        param: &str,
    ) -> Result<Vec<f64>, TimingError> {
        let d_dm = self.d_dm_d_param(ctx, toas, param)?;
        Ok(d_dm_to_d_delay(&d_dm, &dedispersion_freqs(ctx, toas)))
    }

    /// Per-TOA geometry of one segment over the TOAs it covers.
    fn segment_geometry(
        &self,
        ctx: &PulsarContext,
        toas: &Toas,
        seg: &SwxSegment,
    ) -> Result<Vec<(usize, f64)>, TimingError> {
        let r = seg.range();
        let mjds = toas.mjds();
        let idx: Vec<usize> = (0..toas.len()).filter(|&i| r.contains(mjds[i])).collect();
        if idx.is_empty() {
            return Ok(Vec::new());
        }
        let sub = toas.subset(&idx);
        let (theta, rr) = ctx.sun_angle(&sub);
        let geom = power_law_geometry(&theta, &rr, seg.power.value())?;
        Ok(idx.into_iter().zip(geom).collect())
    }

    /// Approximate maximum DM at the first solar conjunction after the position
    /// epoch (circular-orbit approximation). Segmented models report
    /// per-segment values through [`get_max_dms`](Self::get_max_dms).
    pub fn get_max_dm(&self, ctx: &PulsarContext) -> Result<Dm, TimingError> {
        self.ensure_validated()?;
        let (_, elongation) = ctx.conjunction_after(ctx.posepoch());
        match &self.model {
            SolarWindModel::Spherical { ne_sw } => {
                Ok(ne_sw.value() * spherical_geometry_one(elongation, 1.0))
            }
            SolarWindModel::PowerLaw { ne_sw, p } => {
                Ok(ne_sw.value() * power_law_geometry_one(elongation, 1.0, p.value())?)
            }
            SolarWindModel::Scaled { dm_max, .. } => Ok(dm_max.value()),
            SolarWindModel::Segmented { .. } => Err(TimingError::UnsupportedSolarWindModel(
                "segmented (use get_max_dms)".to_string(),
            )),
        }
    }

    /// Approximate minimum DM, 180° away from conjunction.
    pub fn get_min_dm(&self, ctx: &PulsarContext) -> Result<Dm, TimingError> {
        self.ensure_validated()?;
        let (_, elongation) = ctx.conjunction_after(ctx.posepoch());
        match &self.model {
            SolarWindModel::Spherical { ne_sw } => {
                Ok(ne_sw.value() * spherical_geometry_one(PI - elongation, 1.0))
            }
            SolarWindModel::PowerLaw { ne_sw, p } => {
                Ok(ne_sw.value() * power_law_geometry_one(PI - elongation, 1.0, p.value())?)
            }
            SolarWindModel::Scaled { dm_max, p } => {
                let theta0 = ctx.ecliptic_lat().abs();
                let far = power_law_geometry_one(PI - theta0, 1.0, p.value())?;
                let fid = power_law_geometry_one(theta0, 1.0, p.value())?;
                Ok(dm_max.value() * far / fid)
            }
            SolarWindModel::Segmented { .. } => Err(TimingError::UnsupportedSolarWindModel(
                "segmented (use get_min_dms)".to_string(),
            )),
        }
    }

    /// Per-segment maximum DMs, each at the first conjunction after the
    /// segment's start. Only meaningful for the segmented strategy.
    pub fn get_max_dms(&self, ctx: &PulsarContext) -> Result<Vec<Dm>, TimingError> {
        self.segment_extremes(ctx, |e| e)
    }

    /// Per-segment minimum DMs, 180° away from each segment's conjunction.
    pub fn get_min_dms(&self, ctx: &PulsarContext) -> Result<Vec<Dm>, TimingError> {
        self.segment_extremes(ctx, |e| PI - e)
    }

    fn segment_extremes(
        &self,
        ctx: &PulsarContext,
        angle: impl Fn(Radian) -> Radian,
    ) -> Result<Vec<Dm>, TimingError> {
        self.ensure_validated()?;
        let SolarWindModel::Segmented { segments } = &self.model else {
            return Err(TimingError::UnsupportedSolarWindModel(
                "per-segment extremes require the segmented strategy".to_string(),
            ));
        };
        let mut dms = Vec::with_capacity(segments.len());
        for (_, seg) in segments.iter() {
            let (_, elongation) = ctx.conjunction_after(seg.start.value());
            let g = power_law_geometry_one(angle(elongation), 1.0, seg.power.value())?;
            dms.push(seg.ne_sw.value() * g);
        }
        Ok(dms)
    }

    /// The effective electron density at 1 AU. For the scaled strategy this is
    /// `SWDMMAX` divided by the fiducial path length.
    pub fn get_ne_sw(&self, ctx: &PulsarContext) -> Result<f64, TimingError> {
        match &self.model {
            SolarWindModel::Spherical { ne_sw } | SolarWindModel::PowerLaw { ne_sw, .. } => {
                Ok(ne_sw.value())
            }
            SolarWindModel::Scaled { dm_max, p } => {
                Ok(dm_max.value() / fiducial_geometry(ctx, p.value())?)
            }
            SolarWindModel::Segmented { .. } => Err(TimingError::UnsupportedSolarWindModel(
                "segmented models have per-segment densities".to_string(),
            )),
        }
    }

    /// Par-file rendition of this component's parameters.
    pub fn print_par(&self) -> String {
        match &self.model {
            SolarWindModel::Spherical { ne_sw } => {
                let mut out = ne_sw.as_parfile_line();
                out += &Param::new("SWM", 0.0, true).as_parfile_line();
                out
            }
            SolarWindModel::PowerLaw { ne_sw, p } => {
                let mut out = ne_sw.as_parfile_line();
                out += &Param::new("SWM", 1.0, true).as_parfile_line();
                out += &p.as_parfile_line();
                out
            }
            SolarWindModel::Scaled { dm_max, p } => {
                let mut out = dm_max.as_parfile_line();
                out += &p.as_parfile_line();
                out
            }
            SolarWindModel::Segmented { segments } => segments.as_parfile(),
        }
    }

    /// Set the value of a parameter by name (segment parameters included).
    pub fn set_param(&mut self, name: &str, value: f64) -> Result<(), TimingError> {
        let unknown = || TimingError::UnknownParameter(name.to_string());
        match &mut self.model {
            SolarWindModel::Spherical { ne_sw } => match name {
                "NE_SW" => ne_sw.set_value(value),
                _ => return Err(unknown()),
            },
            SolarWindModel::PowerLaw { ne_sw, p } => match name {
                "NE_SW" => ne_sw.set_value(value),
                "SWP" => p.set_value(value),
                _ => return Err(unknown()),
            },
            SolarWindModel::Scaled { dm_max, p } => match name {
                "SWDMMAX" => dm_max.set_value(value),
                "SWPP" => p.set_value(value),
                _ => return Err(unknown()),
            },
            SolarWindModel::Segmented { segments } => {
                let (family, index) = split_prefixed_name(name).ok_or_else(unknown)?;
                let seg = segments.get_mut(index).ok_or_else(unknown)?;
                match family {
                    "SWX_" => seg.ne_sw.set_value(value),
                    "SWXP_" => seg.power.set_value(value),
                    "SWXR1_" => seg.start.set_value(value),
                    "SWXR2_" => seg.end.set_value(value),
                    _ => return Err(unknown()),
                }
            }
        }
        Ok(())
    }

    /// Register a new segment; the component re-runs setup and validation
    /// before returning. Only legal on the segmented strategy.
    pub fn add_range(
        &mut self,
        mjd_start: Option<MJD>,
        mjd_end: Option<MJD>,
        index: Option<u16>,
        ne_sw: f64,
        power: f64,
        frozen: bool,
    ) -> Result<u16, TimingError> {
        let new = self.with_segments(|segments| {
            segments.add_range(mjd_start, mjd_end, index, ne_sw, power, frozen)
        })?;
        Ok(new)
    }

    /// Remove segments by index, then re-run setup and validation.
    pub fn remove_range(&mut self, indices: &[u16]) -> Result<(), TimingError> {
        self.with_segments(|segments| segments.remove_range(indices))
    }

    /// Split the segment containing `at`; see [`SegmentSet::split_range`].
    pub fn split_range(&mut self, at: MJD) -> Result<(u16, u16), TimingError> {
        self.with_segments(|segments| segments.split_range(at))
    }

    /// Merge two segments; see [`SegmentSet::merge_ranges`].
    pub fn merge_ranges(
        &mut self,
        first: u16,
        second: u16,
        value: MergeValue,
    ) -> Result<u16, TimingError> {
        self.with_segments(|segments| segments.merge_ranges(first, second, value))
    }

    /// Run a structural mutation and re-establish the validated state.
    ///
    /// Every [`SegmentSet`] mutation checks its arguments before touching the
    /// set, so a rejected op leaves the segments (and the validated flag)
    /// exactly as they were; only a successful mutation triggers the
    /// setup/validate cycle.
    fn with_segments<T>(
        &mut self,
        op: impl FnOnce(&mut SegmentSet) -> Result<T, TimingError>,
    ) -> Result<T, TimingError> {
        let SolarWindModel::Segmented { segments } = &mut self.model else {
            return Err(TimingError::UnsupportedSolarWindModel(
                "structural mutations require the segmented strategy".to_string(),
            ));
        };
        let out = op(segments)?;
        self.validated = false;
        self.setup();
        self.validate()?;
        self.validated = true;
        Ok(out)
    }
}

/// Path length at the fiducial elongation: the pulsar's |ecliptic latitude|,
/// r = 1 AU. This is where the scaled model's DM is largest.
fn fiducial_geometry(ctx: &PulsarContext, p: f64) -> Result<f64, TimingError> {
    power_law_geometry_one(ctx.ecliptic_lat().abs(), 1.0, p)
}

fn d_fiducial_geometry_d_p(ctx: &PulsarContext, p: f64) -> Result<f64, TimingError> {
    d_power_law_geometry_d_p_one(ctx.ecliptic_lat().abs(), 1.0, p)
}

#[cfg(test)]
mod solar_wind_test {
    use super::*;
    use crate::time::PulsarMjd;
    use crate::toas::Toa;
    use approx::assert_relative_eq;

    fn ctx() -> PulsarContext {
        PulsarContext::new(120.0, 5.0).with_posepoch(55000.0)
    }

    fn toas_at(mjds: &[f64]) -> Toas {
        Toas::new(
            mjds.iter()
                .map(|&m| Toa::new(PulsarMjd::from_f64(m), 1400.0))
                .collect(),
        )
    }

    fn sample_toas() -> Toas {
        toas_at(&[55000.0, 55090.0, 55180.0, 55270.0])
    }

    #[test]
    fn test_spherical_matches_power_law_at_p2() {
        let ctx = ctx();
        let toas = sample_toas();
        let dm_sph = SolarWind::new_spherical(8.0).dm(&ctx, &toas).unwrap();
        let dm_pl = SolarWind::new_power_law(8.0, 2.0).dm(&ctx, &toas).unwrap();
        for (a, b) in dm_sph.iter().zip(&dm_pl) {
            assert_relative_eq!(a, b, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_zero_amplitude_short_circuits() {
        let ctx = ctx();
        let toas = sample_toas();
        assert_eq!(
            SolarWind::new_spherical(0.0).dm(&ctx, &toas).unwrap(),
            vec![0.0; 4]
        );
        assert_eq!(
            SolarWind::new_power_law(0.0, 2.5).dm(&ctx, &toas).unwrap(),
            vec![0.0; 4]
        );
    }

    #[test]
    fn test_delay_is_dm_over_freq_squared() {
        let ctx = ctx();
        let toas = sample_toas();
        let sw = SolarWind::new_spherical(8.0);
        let dm = sw.dm(&ctx, &toas).unwrap();
        let delay = sw.delay(&ctx, &toas).unwrap();
        for (d, t) in dm.iter().zip(&delay) {
            assert_relative_eq!(
                t,
                &(crate::constants::DM_CONST * d / (1400.0 * 1400.0)),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_deriv_params_per_strategy() {
        assert_eq!(SolarWind::new_spherical(8.0).deriv_params(), vec!["NE_SW"]);
        assert_eq!(
            SolarWind::new_power_law(8.0, 2.5).deriv_params(),
            vec!["NE_SW", "SWP"]
        );
        assert_eq!(
            SolarWind::new_scaled(1e-3, 2.5).deriv_params(),
            vec!["SWDMMAX", "SWPP"]
        );
    }

    #[test]
    fn test_d_dm_d_ne_sw_is_geometry() {
        // DM is linear in the density, so the derivative is exact
        let ctx = ctx();
        let toas = sample_toas();
        let sw = SolarWind::new_power_law(8.0, 2.5);
        let dm = sw.dm(&ctx, &toas).unwrap();
        let d = sw.d_dm_d_param(&ctx, &toas, "NE_SW").unwrap();
        for (dm_i, d_i) in dm.iter().zip(&d) {
            assert_relative_eq!(dm_i, &(8.0 * d_i), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_d_dm_d_swp_matches_finite_difference() {
        let ctx = ctx();
        let toas = sample_toas();
        let h = 1e-5;
        for p in [1.5, 2.0, 3.0] {
            let analytic = SolarWind::new_power_law(8.0, p)
                .d_dm_d_param(&ctx, &toas, "SWP")
                .unwrap();
            let hi = SolarWind::new_power_law(8.0, p + h).dm(&ctx, &toas).unwrap();
            let lo = SolarWind::new_power_law(8.0, p - h).dm(&ctx, &toas).unwrap();
            for i in 0..toas.len() {
                let fd = (hi[i] - lo[i]) / (2.0 * h);
                assert_relative_eq!(analytic[i], fd, max_relative = 5e-4);
            }
        }
    }

    #[test]
    fn test_scaled_derivatives_match_finite_difference() {
        let ctx = ctx();
        let toas = sample_toas();
        let h = 1e-5;
        let p = 2.3;
        let sw = SolarWind::new_scaled(1e-3, p);
        // SWDMMAX enters linearly
        let dm = sw.dm(&ctx, &toas).unwrap();
        let d_max = sw.d_dm_d_param(&ctx, &toas, "SWDMMAX").unwrap();
        for i in 0..toas.len() {
            assert_relative_eq!(dm[i], 1e-3 * d_max[i], max_relative = 1e-12);
        }
        // SWPP through both the geometry and the fiducial normalization
        let analytic = sw.d_dm_d_param(&ctx, &toas, "SWPP").unwrap();
        let hi = SolarWind::new_scaled(1e-3, p + h).dm(&ctx, &toas).unwrap();
        let lo = SolarWind::new_scaled(1e-3, p - h).dm(&ctx, &toas).unwrap();
        for i in 0..toas.len() {
            let fd = (hi[i] - lo[i]) / (2.0 * h);
            assert_relative_eq!(analytic[i], fd, max_relative = 5e-4);
        }
    }

    #[test]
    fn test_scaled_ne_sw_times_fiducial_is_dm_max() {
        let ctx = ctx();
        let sw = SolarWind::new_scaled(2.5e-3, 2.2);
        let ne_sw = sw.get_ne_sw(&ctx).unwrap();
        let fid = fiducial_geometry(&ctx, 2.2).unwrap();
        assert_relative_eq!(ne_sw * fid, 2.5e-3, max_relative = 1e-12);
        assert_eq!(sw.get_max_dm(&ctx), Ok(2.5e-3));
    }

    #[test]
    fn test_segmented_accumulation() {
        let ctx = ctx();
        let mut set = SegmentSet::new();
        set.add_range(Some(55000.0), Some(55100.0), None, 8.0, 2.0, false)
            .unwrap();
        set.add_range(Some(55100.0), Some(55200.0), None, 4.0, 2.5, false)
            .unwrap();
        let sw = SolarWind::new_segmented(set).unwrap();
        // one TOA per segment, one uncovered
        let toas = toas_at(&[55050.0, 55150.0, 55250.0]);
        let dm = sw.dm(&ctx, &toas).unwrap();
        let first = SolarWind::new_power_law(8.0, 2.0)
            .dm(&ctx, &toas.subset(&[0]))
            .unwrap();
        let second = SolarWind::new_power_law(4.0, 2.5)
            .dm(&ctx, &toas.subset(&[1]))
            .unwrap();
        assert_relative_eq!(dm[0], first[0], max_relative = 1e-12);
        assert_relative_eq!(dm[1], second[0], max_relative = 1e-12);
        assert_eq!(dm[2], 0.0);
    }

    #[test]
    fn test_segmented_derivatives_are_local() {
        let ctx = ctx();
        let mut set = SegmentSet::new();
        set.add_range(Some(55000.0), Some(55100.0), None, 8.0, 2.0, false)
            .unwrap();
        set.add_range(Some(55100.0), Some(55200.0), None, 4.0, 2.5, false)
            .unwrap();
        let sw = SolarWind::new_segmented(set).unwrap();
        assert_eq!(
            sw.deriv_params(),
            vec!["SWXP_0001", "SWXP_0002", "SWX_0001", "SWX_0002"]
        );
        let toas = toas_at(&[55050.0, 55150.0, 55250.0]);
        let d1 = sw.d_dm_d_param(&ctx, &toas, "SWX_0001").unwrap();
        assert!(d1[0] > 0.0);
        assert_eq!(d1[1], 0.0);
        assert_eq!(d1[2], 0.0);
        let dp2 = sw.d_dm_d_param(&ctx, &toas, "SWXP_0002").unwrap();
        assert_eq!(dp2[0], 0.0);
        assert!(dp2[1] != 0.0);
        assert_eq!(dp2[2], 0.0);
    }

    #[test]
    fn test_structural_ops_rebuild_deriv_table() {
        let ctx = ctx();
        let mut set = SegmentSet::new();
        set.add_range(Some(55000.0), Some(55100.0), None, 8.0, 2.0, false)
            .unwrap();
        let mut sw = SolarWind::new_segmented(set).unwrap();
        let idx = sw
            .add_range(Some(55100.0), Some(55200.0), None, 4.0, 2.5, false)
            .unwrap();
        assert_eq!(idx, 2);
        assert_eq!(
            sw.deriv_params(),
            vec!["SWXP_0001", "SWXP_0002", "SWX_0001", "SWX_0002"]
        );
        // queries keep working right after the mutation
        assert!(sw.dm(&ctx, &toas_at(&[55150.0])).is_ok());
        sw.remove_range(&[idx]).unwrap();
        assert_eq!(sw.deriv_params(), vec!["SWXP_0001", "SWX_0001"]);
        assert!(matches!(
            sw.d_dm_d_param(&ctx, &toas_at(&[55150.0]), "SWX_0002"),
            Err(TimingError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_rejected_mutation_keeps_model_queryable() {
        let ctx = ctx();
        let toas = toas_at(&[55050.0]);
        let mut set = SegmentSet::new();
        set.add_range(Some(55000.0), Some(55100.0), None, 8.0, 2.0, false)
            .unwrap();
        let mut sw = SolarWind::new_segmented(set).unwrap();
        let dm_before = sw.dm(&ctx, &toas).unwrap();
        // rejected mutations leave the set untouched and the model usable
        assert!(matches!(
            sw.add_range(Some(55400.0), Some(55300.0), None, 8.0, 2.0, false),
            Err(TimingError::InvertedRange { .. })
        ));
        assert!(matches!(
            sw.add_range(Some(55200.0), Some(55300.0), Some(1), 8.0, 2.0, false),
            Err(TimingError::IndexInUse(1))
        ));
        assert!(matches!(
            sw.split_range(55200.0),
            Err(TimingError::NoSegmentAtEpoch(_))
        ));
        assert_eq!(sw.dm(&ctx, &toas), Ok(dm_before));
        assert_eq!(sw.deriv_params(), vec!["SWXP_0001", "SWX_0001"]);
    }

    #[test]
    fn test_structural_ops_rejected_off_segmented() {
        let mut sw = SolarWind::new_spherical(8.0);
        assert!(matches!(
            sw.add_range(Some(55000.0), Some(55100.0), None, 8.0, 2.0, false),
            Err(TimingError::UnsupportedSolarWindModel(_))
        ));
    }

    #[test]
    fn test_max_min_dm_bracket_the_series() {
        let ctx = ctx();
        let toas = toas_at(&(0..365).map(|d| 55000.0 + d as f64).collect::<Vec<_>>());
        let sw = SolarWind::new_power_law(8.0, 2.0);
        let dm = sw.dm(&ctx, &toas).unwrap();
        let max = sw.get_max_dm(&ctx).unwrap();
        let min = sw.get_min_dm(&ctx).unwrap();
        let series_max = dm.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let series_min = dm.iter().cloned().fold(f64::INFINITY, f64::min);
        // circular-orbit estimate, so only loose agreement is expected
        assert_relative_eq!(max, series_max, max_relative = 0.1);
        assert_relative_eq!(min, series_min, max_relative = 0.1);
        assert!(max > min);
    }

    #[test]
    fn test_segment_extremes_per_segment() {
        let ctx = ctx();
        let mut set = SegmentSet::new();
        set.add_range(Some(55000.0), Some(55100.0), None, 8.0, 2.0, false)
            .unwrap();
        set.add_range(Some(55100.0), Some(55200.0), None, 4.0, 2.0, false)
            .unwrap();
        let sw = SolarWind::new_segmented(set).unwrap();
        let maxs = sw.get_max_dms(&ctx).unwrap();
        let mins = sw.get_min_dms(&ctx).unwrap();
        assert_eq!(maxs.len(), 2);
        // same power and conjunction geometry, so extremes scale with density
        assert_relative_eq!(maxs[0] / maxs[1], 2.0, max_relative = 1e-10);
        assert!(maxs[0] > mins[0]);
        // single-value accessor is not meaningful here
        assert!(sw.get_max_dm(&ctx).is_err());
    }

    #[test]
    fn test_print_par() {
        let text = SolarWind::new_power_law(7.9, 2.5).print_par();
        let names: Vec<&str> = text
            .lines()
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(names, vec!["NE_SW", "SWM", "SWP"]);
        assert!(text.lines().nth(1).unwrap().split_whitespace().nth(1) == Some("1"));

        let text = SolarWind::new_spherical(7.9).print_par();
        let names: Vec<&str> = text
            .lines()
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(names, vec!["NE_SW", "SWM"]);
    }

    #[test]
    fn test_set_param() {
        let ctx = ctx();
        let toas = sample_toas();
        let mut sw = SolarWind::new_power_law(8.0, 2.0);
        sw.set_param("NE_SW", 4.0).unwrap();
        let dm_half = sw.dm(&ctx, &toas).unwrap();
        let dm_full = SolarWind::new_power_law(8.0, 2.0).dm(&ctx, &toas).unwrap();
        for (h, f) in dm_half.iter().zip(&dm_full) {
            assert_relative_eq!(2.0 * h, *f, max_relative = 1e-12);
        }
        assert!(matches!(
            sw.set_param("SWDMMAX", 1.0),
            Err(TimingError::UnknownParameter(_))
        ));
    }
}
