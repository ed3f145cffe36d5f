use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::core::vector::{Vec3, DIM};
use crate::core::{BodyId, Effect, SimConfig, Simulation, Species};

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn to_vec3(v: &[f64], what: &str) -> PyResult<Vec3> {
    if v.len() != DIM {
        return Err(py_err(format!("{what} must have length {DIM}")));
    }
    Ok([v[0], v[1], v[2]])
}

fn to_ids(ids: &[u64]) -> Vec<BodyId> {
    ids.iter().map(|&i| BodyId(i)).collect()
}

fn from_ids(ids: &[BodyId]) -> Vec<u64> {
    ids.iter().map(|id| id.0).collect()
}

fn rows_to_array(rows: Vec<Vec3>) -> Array2<f64> {
    let mut arr = Array2::<f64>::zeros((rows.len(), DIM));
    for (i, row) in rows.iter().enumerate() {
        for k in 0..DIM {
            arr[[i, k]] = row[k];
        }
    }
    arr
}

/// Python-facing wrapper around the Rust `Simulation` core.
///
/// API:
/// - __new__(seed=None, config=None)
/// - inject(species, pos, vel=None) -> id
/// - step(dt), advance_frame(frame_dt=None)
/// - get_ids(), get_symbols(), get_positions(), get_velocities()
/// - assemble(ids, ejection=None), pair_production(pos, energy, on_discover=None), fuse(ids)
/// - audit_cursor(), audit_events(since=0), drain_effects(), labels()
#[pyclass]
pub struct ParticleSandbox {
    sim: Simulation,
}

#[pymethods]
impl ParticleSandbox {
    /// Create an empty sandbox.
    ///
    /// Parameters
    /// - seed: RNG seed (int) for reproducibility; None for nondeterministic
    /// - config: optional TOML string overriding default parameters
    ///
    /// Errors: raises ValueError on invalid configuration.
    #[new]
    #[pyo3(signature = (seed=None, config=None))]
    fn new(seed: Option<u64>, config: Option<String>) -> PyResult<Self> {
        let cfg = match config.as_deref() {
            Some(src) => SimConfig::from_toml_str(src).map_err(py_err)?,
            None => SimConfig::default(),
        };
        let sim = Simulation::new(cfg, seed).map_err(py_err)?;
        Ok(Self { sim })
    }

    /// Inject a body by name ("electron", "u", "O", "U-235", ...) and return its id.
    #[pyo3(signature = (species, pos, vel=None))]
    fn inject(&mut self, species: &str, pos: Vec<f64>, vel: Option<Vec<f64>>) -> PyResult<u64> {
        let species = Species::parse(species, self.sim.tables().elements).map_err(py_err)?;
        let pos = to_vec3(&pos, "pos")?;
        let vel = match vel {
            Some(v) => to_vec3(&v, "vel")?,
            None => [0.0; DIM],
        };
        self.sim.inject(species, pos, vel).map(|id| id.0).map_err(py_err)
    }

    /// Run one tick (releases the GIL during computation).
    fn step(&mut self, py: Python<'_>, dt: f64) -> PyResult<()> {
        py.detach(|| self.sim.step(dt)).map_err(py_err)
    }

    /// Advance one frame split into the configured substeps (releases the GIL).
    #[pyo3(signature = (frame_dt=None))]
    fn advance_frame(&mut self, py: Python<'_>, frame_dt: Option<f64>) -> PyResult<()> {
        let frame_dt = frame_dt.unwrap_or(self.sim.config().tick.frame_dt);
        py.detach(|| self.sim.advance_frame(frame_dt))
            .map_err(py_err)
    }

    fn time(&self) -> f64 {
        self.sim.time()
    }

    fn tick_count(&self) -> u64 {
        self.sim.tick_count()
    }

    fn kinetic_energy(&self) -> f64 {
        self.sim.kinetic_energy()
    }

    fn total_charge(&self) -> f64 {
        self.sim.total_charge()
    }

    /// Body ids in the same order as the position/velocity rows.
    fn get_ids(&self) -> Vec<u64> {
        self.sim.bodies().iter().map(|b| b.id.0).collect()
    }

    /// Display symbols ("e⁻", "p⁺", "O", ...) in row order.
    fn get_symbols(&self) -> Vec<String> {
        let elements = self.sim.tables().elements;
        self.sim.bodies().iter().map(|b| b.symbol(elements)).collect()
    }

    /// Charges in row order.
    fn get_charges(&self) -> Vec<f64> {
        self.sim.bodies().iter().map(|b| b.charge).collect()
    }

    /// Return positions as a NumPy array of shape (N, 3), dtype=float64.
    fn get_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let pyarr = rows_to_array(self.sim.positions()).into_pyarray(py);
        Ok(pyarr.to_owned().into())
    }

    /// Return velocities as a NumPy array of shape (N, 3), dtype=float64.
    fn get_velocities<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let pyarr = rows_to_array(self.sim.velocities()).into_pyarray(py);
        Ok(pyarr.to_owned().into())
    }

    /// Set all body velocities from a NumPy array of shape (N, 3), dtype=float64.
    /// Values must be finite.
    fn set_velocities<'py>(&mut self, velocities: PyReadonlyArray2<'py, f64>) -> PyResult<()> {
        let arr = velocities.as_array();
        let ids: Vec<BodyId> = self.sim.bodies().iter().map(|b| b.id).collect();
        if arr.shape()[0] != ids.len() || arr.shape()[1] != DIM {
            return Err(py_err(format!(
                "velocities must have shape ({}, {}), got {:?}",
                ids.len(),
                DIM,
                arr.shape()
            )));
        }
        for (i, id) in ids.into_iter().enumerate() {
            let vel = [arr[[i, 0]], arr[[i, 1]], arr[[i, 2]]];
            self.sim.set_velocity(id, vel).map_err(py_err)?;
        }
        Ok(())
    }

    /// Ids bonded (directly or transitively) to `id`, including `id`.
    fn connected_group(&self, id: u64) -> PyResult<Vec<u64>> {
        self.sim
            .connected_group(BodyId(id))
            .map(|g| from_ids(&g))
            .map_err(py_err)
    }

    /// Name of the catalog molecule formed by the group around `id`, if any.
    fn identify(&self, id: u64) -> Option<String> {
        self.sim.identify(BodyId(id)).map(|r| r.name.clone())
    }

    /// Assemble the selection into molecules.
    ///
    /// Returns: dict {"molecules": [(name, formula, [ids])], "leftovers": [ids]}
    #[pyo3(signature = (ids, ejection=None))]
    fn assemble<'py>(
        &mut self,
        py: Python<'py>,
        ids: Vec<u64>,
        ejection: Option<Vec<f64>>,
    ) -> PyResult<Py<PyDict>> {
        let ejection = match ejection {
            Some(v) => Some(to_vec3(&v, "ejection")?),
            None => None,
        };
        let report = self.sim.assemble(&to_ids(&ids), ejection).map_err(py_err)?;
        let molecules: Vec<(String, String, Vec<u64>)> = report
            .molecules
            .iter()
            .map(|m| (m.name.clone(), m.formula.clone(), from_ids(&m.atoms)))
            .collect();
        let out = PyDict::new(py);
        out.set_item("molecules", molecules)?;
        out.set_item("leftovers", from_ids(&report.leftovers))?;
        Ok(out.into())
    }

    /// Convert a photon of `energy` MeV at `pos` into a particle pair.
    ///
    /// `on_discover(symbol)` is called for each produced species. Returns the new ids.
    #[pyo3(signature = (pos, energy, on_discover=None))]
    fn pair_production(
        &mut self,
        py: Python<'_>,
        pos: Vec<f64>,
        energy: f64,
        on_discover: Option<Py<PyAny>>,
    ) -> PyResult<Vec<u64>> {
        let pos = to_vec3(&pos, "pos")?;
        let mut failure: Option<PyErr> = None;
        let ids = self.sim.pair_production(pos, energy, |symbol| {
            let Some(cb) = &on_discover else {
                return;
            };
            if failure.is_none() {
                failure = cb.call1(py, (symbol,)).err();
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(from_ids(&ids)),
        }
    }

    /// Fuse the selection up the fusion ladder; returns the product ids.
    fn fuse(&mut self, ids: Vec<u64>) -> PyResult<Vec<u64>> {
        self.sim
            .fuse(&to_ids(&ids))
            .map(|out| from_ids(&out))
            .map_err(py_err)
    }

    /// Sequence number the next audit event will receive.
    fn audit_cursor(&self) -> u64 {
        self.sim.audit().cursor()
    }

    /// Retained audit events with seq >= `since`.
    ///
    /// Returns: list of (seq, kind, body_id, label, reason, time)
    #[pyo3(signature = (since=0))]
    fn audit_events(&self, since: u64) -> Vec<(u64, String, u64, String, String, f64)> {
        self.sim
            .audit()
            .since(since)
            .map(|e| {
                (
                    e.seq,
                    e.kind.to_string(),
                    e.body.0,
                    e.label.clone(),
                    e.reason.clone(),
                    e.time,
                )
            })
            .collect()
    }

    /// Visual effects queued since the last call.
    ///
    /// Returns: list of (kind, (x, y, z), size, text)
    fn drain_effects(&mut self) -> Vec<(String, (f64, f64, f64), f64, String)> {
        let tuple = |p: Vec3| (p[0], p[1], p[2]);
        self.sim
            .drain_effects()
            .into_iter()
            .map(|fx| match fx {
                Effect::Burst { pos, size, reason } => {
                    ("burst".to_string(), tuple(pos), size, reason.to_string())
                }
                Effect::Marker { pos, size, text } => ("marker".to_string(), tuple(pos), size, text),
                Effect::ReleaseCue { pos, bodies } => (
                    "release".to_string(),
                    tuple(pos),
                    bodies.len() as f64,
                    String::new(),
                ),
                Effect::Discovery { pos, symbol } => ("discovery".to_string(), tuple(pos), 1.0, symbol),
            })
            .collect()
    }

    /// Floating molecule labels: list of (name, formula, [ids]).
    fn labels(&self) -> Vec<(String, String, Vec<u64>)> {
        self.sim
            .labels()
            .iter()
            .map(|l| (l.name.clone(), l.formula.clone(), from_ids(&l.key)))
            .collect()
    }
}

/// The chemsim Python module entry point.
#[pymodule]
fn chemsim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ParticleSandbox>()?;
    Ok(())
}
