use std::io::Write;
use std::ops::Range;

use ndarray::{Array2, ArrayView1, Axis};

use crate::model::{Compartment, Compartments};

/// Uniformly sampled solution of the model.
///
/// Row `i` of the state matrix holds the compartments at `times[i]`; columns
/// follow [Compartment::index].
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Array2<f64>,
}

impl Trajectory {
    pub(crate) fn new(times: Vec<f64>, states: Array2<f64>) -> Self {
        debug_assert_eq!(times.len(), states.nrows());
        debug_assert_eq!(states.ncols(), Compartment::ALL.len());
        Self { times, states }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &Array2<f64> {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time course of one compartment.
    pub fn series(&self, compartment: Compartment) -> ArrayView1<'_, f64> {
        self.states.column(compartment.index())
    }

    pub fn sample(&self, index: usize) -> Option<(f64, Compartments)> {
        let time = *self.times.get(index)?;
        let row = self.states.row(index);
        let state = Compartments::from_slice(row.as_slice()?)?;
        Some((time, state))
    }

    pub fn last(&self) -> Option<(f64, Compartments)> {
        self.sample(self.len().checked_sub(1)?)
    }

    /// `C + C_P + C_H` at every sample.
    pub fn total_contaminant(&self) -> Vec<f64> {
        self.states
            .axis_iter(Axis(0))
            .map(|row| Compartment::CONTAMINANT.iter().map(|c| row[c.index()]).sum())
            .collect()
    }

    pub fn overview(&self) -> Overview {
        let population = Panel::time_course(
            "Population dynamics",
            "Biomass",
            self,
            &Compartment::BIOMASS,
        );
        let contaminant = Panel::time_course(
            "Contaminant dynamics",
            "Contaminant",
            self,
            &Compartment::CONTAMINANT,
        );

        let plant = self.series(Compartment::Plant);
        let herbivore = self.series(Compartment::Herbivore);
        let phase = Panel {
            title: "Phase portrait",
            x_label: "Plant biomass (P)",
            y_label: "Herbivore biomass (H)",
            x_range: axis_range(plant.iter().copied()),
            y_range: axis_range(herbivore.iter().copied()),
            series: vec![Series {
                label: "H vs P".to_string(),
                points: plant.iter().copied().zip(herbivore.iter().copied()).collect(),
            }],
        };

        Overview {
            population,
            contaminant,
            phase,
        }
    }

    /// One row per sample: `t, C, C_P, C_H, P, H`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(writer);
        let mut header = vec!["t"];
        header.extend(Compartment::ALL.iter().map(|c| c.symbol()));
        writer.write_record(&header)?;
        for (time, row) in self.times.iter().zip(self.states.axis_iter(Axis(0))) {
            let mut record = vec![time.to_string()];
            record.extend(row.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// The three summary panels derived from a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub population: Panel,
    pub contaminant: Panel,
    pub phase: Panel,
}

impl Overview {
    pub fn panels(&self) -> [&Panel; 3] {
        [&self.population, &self.contaminant, &self.phase]
    }
}

/// Numeric content and axis semantics of one figure panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl Panel {
    fn time_course(
        title: &'static str,
        y_label: &'static str,
        trajectory: &Trajectory,
        compartments: &[Compartment],
    ) -> Self {
        let series: Vec<Series> = compartments
            .iter()
            .map(|&c| Series {
                label: c.symbol().to_string(),
                points: trajectory
                    .times()
                    .iter()
                    .copied()
                    .zip(trajectory.series(c).iter().copied())
                    .collect(),
            })
            .collect();
        let y_range = axis_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));
        Panel {
            title,
            x_label: "Time",
            y_label,
            x_range: axis_range(trajectory.times().iter().copied()),
            series,
            y_range,
        }
    }
}

/// `[0, max]` of the displayed values, or `[0, 1]` when nothing positive is shown.
fn axis_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let max = values.filter(|v| v.is_finite()).fold(0.0, f64::max);
    if max > 0.0 {
        0.0..max
    } else {
        0.0..1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn trajectory() -> Trajectory {
        Trajectory::new(
            vec![0.0, 1.0, 2.0],
            array![
                [1.0, 0.0, 0.0, 1.0, 1.0],
                [0.8, 0.1, 0.1, 2.0, 0.5],
                [0.6, 0.3, 0.1, 3.0, 0.25],
            ],
        )
    }

    #[test]
    fn test_samples_and_series() {
        let trajectory = trajectory();
        assert_eq!(trajectory.len(), 3);
        assert_eq!(
            trajectory.series(Compartment::Plant).to_vec(),
            vec![1.0, 2.0, 3.0]
        );
        let (t, state) = trajectory.last().unwrap();
        assert_eq!(t, 2.0);
        assert_eq!(state[Compartment::Herbivore], 0.25);
        assert!(trajectory.sample(3).is_none());
    }

    #[test]
    fn test_total_contaminant_per_sample() {
        let totals = trajectory().total_contaminant();
        for total in totals {
            approx::assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_overview_axis_ranges() {
        let overview = trajectory().overview();
        assert_eq!(overview.population.x_range, 0.0..2.0);
        assert_eq!(overview.population.y_range, 0.0..3.0);
        assert_eq!(overview.contaminant.y_range, 0.0..1.0);
        assert_eq!(overview.phase.x_range, 0.0..3.0);
        assert_eq!(overview.phase.y_range, 0.0..1.0);
        assert_eq!(overview.population.series.len(), 2);
        assert_eq!(overview.contaminant.series.len(), 3);
        assert_eq!(overview.phase.series[0].points[1], (2.0, 0.5));
    }

    #[test]
    fn test_axis_range_falls_back_for_zero_series() {
        assert_eq!(axis_range([0.0, 0.0].into_iter()), 0.0..1.0);
        assert_eq!(axis_range([f64::NAN, 2.0].into_iter()), 0.0..2.0);
    }

    #[test]
    fn test_write_csv_layout() {
        let mut buffer = Vec::new();
        trajectory().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("t,C,C_P,C_H,P,H"));
        assert_eq!(lines.next(), Some("0,1,0,0,1,1"));
        assert_eq!(text.lines().count(), 4);
    }
}
