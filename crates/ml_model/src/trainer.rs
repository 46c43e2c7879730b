//! Candidate training and the promotion rule.
//!
//! Training walks `BaselineEval -> TunedEval -> Selected`. Each fitted
//! candidate is offered to a [`Selection`], which only replaces its current
//! best when the newcomer is strictly better on both AUC and accuracy.

use std::fmt;

use dataset::LabeledSplit;
use tracing::info;

use crate::boosting::BoostingParams;
use crate::classifier::{ClassifierParams, ModelPipeline};
use crate::experiment::{ExperimentRun, ParamValue};
use crate::forest::ForestParams;
use crate::logistic::LogisticParams;
use crate::metrics::{ConfusionMatrix, Metrics};
use crate::search::{DEFAULT_SEARCH_ITERATIONS, SearchOutcome, randomized_search};
use crate::{ModelError, Result};

pub const RANDOM_FOREST: &str = "RandomForest";
pub const LOGISTIC_REGRESSION: &str = "LogisticRegression";
pub const TUNED_BOOSTING: &str = "GradientBoosting_Tuned";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStage {
    BaselineEval,
    TunedEval,
    Selected,
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BaselineEval => "baseline-eval",
            Self::TunedEval => "tuned-eval",
            Self::Selected => "selected",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub seed: u64,
    pub forest: ForestParams,
    pub logistic: LogisticParams,
    /// Fixed settings of the boosted ensemble; the search overrides the
    /// gridded ones.
    pub boosting: BoostingParams,
    pub search_iterations: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed: 44,
            forest: ForestParams::default(),
            logistic: LogisticParams::default(),
            boosting: BoostingParams::default(),
            search_iterations: DEFAULT_SEARCH_ITERATIONS,
        }
    }
}

impl TrainerConfig {
    /// Small ensembles and a short search, for smoke runs and tests.
    #[must_use]
    pub fn quick(seed: u64) -> Self {
        Self {
            seed,
            forest: ForestParams {
                n_estimators: 20,
                max_depth: None,
            },
            boosting: BoostingParams {
                n_estimators: 15,
                ..BoostingParams::default()
            },
            search_iterations: 3,
            ..Self::default()
        }
    }
}

/// A fitted pipeline and its held-out scores.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub pipeline: ModelPipeline,
    pub metrics: Metrics,
    pub confusion_matrix: ConfusionMatrix,
}

/// `true` when `candidate` beats `best` on AUC and on accuracy.
#[must_use]
pub fn improves(candidate: &Metrics, best: &Metrics) -> bool {
    candidate.auc > best.auc && candidate.accuracy > best.accuracy
}

/// Running best-so-far. The first offered candidate is always kept.
#[derive(Debug, Default)]
pub struct Selection {
    best: Option<Candidate>,
}

impl Selection {
    /// Offers `candidate`; returns whether it became the best.
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        let accept = self
            .best
            .as_ref()
            .map_or(true, |best| improves(&candidate.metrics, &best.metrics));
        if accept {
            self.best = Some(candidate);
        }
        accept
    }

    #[must_use]
    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    #[must_use]
    pub fn into_best(self) -> Option<Candidate> {
        self.best
    }
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub selected: Candidate,
    /// Every candidate's name and scores, in training order.
    pub evaluated: Vec<(String, Metrics)>,
    pub search: SearchOutcome,
    /// One run per candidate, ready for an experiment sink.
    pub runs: Vec<ExperimentRun>,
}

pub struct ModelTrainer {
    config: TrainerConfig,
    stage: TrainingStage,
}

impl ModelTrainer {
    #[must_use]
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            stage: TrainingStage::BaselineEval,
        }
    }

    #[must_use]
    pub fn stage(&self) -> TrainingStage {
        self.stage
    }

    /// Trains every candidate on `train` (already balanced), scores it on
    /// `test` and returns the selected one.
    ///
    /// # Errors
    ///
    /// Any fit failure aborts the run.
    pub fn run(&mut self, train: &LabeledSplit, test: &LabeledSplit) -> Result<TrainingOutcome> {
        if train.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let x_train = train.feature_matrix();
        let y_train = train.label_codes();
        let x_test = test.feature_matrix();
        let y_test = test.label_codes();
        let seed = self.config.seed;

        let mut selection = Selection::default();
        let mut evaluated = Vec::new();
        let mut runs = Vec::new();

        let mut evaluate = |name: &str, params: ClassifierParams, stage: TrainingStage| -> Result<Candidate> {
            let pipeline = ModelPipeline::fit(params, x_train.view(), &y_train, seed)?;
            let proba = pipeline.predict_proba(x_test.view())?;
            let (metrics, confusion_matrix) = Metrics::evaluate(&y_test, &proba);
            info!(%stage, model = name, auc = metrics.auc, accuracy = metrics.accuracy, f1 = metrics.f1, "Candidate evaluated");

            evaluated.push((name.to_string(), metrics));
            Ok(Candidate {
                name: name.to_string(),
                pipeline,
                metrics,
                confusion_matrix,
            })
        };

        self.enter(TrainingStage::BaselineEval);
        for (name, params) in [
            (RANDOM_FOREST, ClassifierParams::RandomForest(self.config.forest)),
            (LOGISTIC_REGRESSION, ClassifierParams::LogisticRegression(self.config.logistic)),
        ] {
            let candidate = evaluate(name, params, TrainingStage::BaselineEval)?;
            runs.push(ExperimentRun::for_candidate(name, &params, &candidate.metrics));
            if selection.offer(candidate) {
                info!(model = name, "New best model");
            }
        }

        self.enter(TrainingStage::TunedEval);
        let search = randomized_search(
            self.config.boosting,
            x_train.view(),
            &y_train,
            self.config.search_iterations,
            seed,
        )?;
        let params = ClassifierParams::GradientBoosting(search.best.params);
        let candidate = evaluate(TUNED_BOOSTING, params, TrainingStage::TunedEval)?;
        runs.push(
            ExperimentRun::for_candidate(TUNED_BOOSTING, &params, &candidate.metrics)
                .param("cv_folds", ParamValue::Number(search.folds as f64))
                .param("search_iterations", ParamValue::Number(search.trials.len() as f64))
                .metric("cv_auc", search.best.mean_auc),
        );
        if selection.offer(candidate) {
            info!(model = TUNED_BOOSTING, "New best model");
        }

        self.enter(TrainingStage::Selected);
        let selected = selection.into_best().ok_or(ModelError::EmptyTrainingSet)?;
        info!(model = %selected.name, metrics = %selected.metrics, "Selected model");
        info!("Confusion matrix:\n{}", selected.confusion_matrix);

        Ok(TrainingOutcome {
            selected,
            evaluated,
            search,
            runs,
        })
    }

    fn enter(&mut self, stage: TrainingStage) {
        info!(from = %self.stage, to = %stage, "Training stage");
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use clinical_schema::{ChestPain, ClinicalRecord, Diagnosis, RestEcg, Sex, Slope, Thal};

    use super::*;

    fn metrics(auc: f64, accuracy: f64) -> Metrics {
        Metrics { auc, accuracy, f1: 0.0 }
    }

    fn record(i: usize, sick: bool) -> ClinicalRecord {
        let i = i as i32;
        ClinicalRecord {
            age: if sick { 60 + i % 15 } else { 35 + i % 15 },
            sex: if i % 2 == 0 { Sex::Male } else { Sex::Female },
            cp: if sick { ChestPain::Asymptomatic } else { ChestPain::NonAnginal },
            trestbps: 120 + i % 20,
            chol: 200 + i % 50,
            fbs: i % 5 == 0,
            restecg: RestEcg::Normal,
            thalch: if sick { 120 + i % 20 } else { 160 + i % 20 },
            exang: sick,
            oldpeak: if sick { 2.0 } else { 0.2 },
            slope: if sick { Slope::Flat } else { Slope::Upsloping },
            ca: u8::from(sick),
            thal: if sick { Thal::ReversibleDefect } else { Thal::Normal },
        }
    }

    fn split(n: usize, offset: usize) -> LabeledSplit {
        let mut s = LabeledSplit::default();
        for i in 0..n {
            let sick = i % 2 == 1;
            let label = if sick { Diagnosis::Present } else { Diagnosis::Absent };
            s.push(record(i + offset, sick), label);
        }
        s
    }

    #[test]
    fn test_improves_requires_both() {
        let best = metrics(0.78, 0.70);
        assert!(improves(&metrics(0.80, 0.75), &best));
        assert!(!improves(&metrics(0.85, 0.69), &best));
        assert!(!improves(&metrics(0.78, 0.75), &best));
    }

    fn candidate(name: &str, m: Metrics) -> Candidate {
        let x = ndarray::array![[0.0], [1.0]];
        let pipeline = ModelPipeline::fit(
            ClassifierParams::LogisticRegression(LogisticParams::default()),
            x.view(),
            &[0, 1],
            0,
        )
        .unwrap();
        Candidate {
            name: name.to_string(),
            pipeline,
            metrics: m,
            confusion_matrix: ConfusionMatrix::default(),
        }
    }

    #[test]
    fn test_first_candidate_always_selected() {
        let mut selection = Selection::default();
        assert!(selection.offer(candidate("first", metrics(0.0, 0.0))));
        assert!(!selection.offer(candidate("second", metrics(0.9, 0.0))));
        assert_eq!(selection.best().unwrap().name, "first");
        assert!(selection.offer(candidate("third", metrics(0.1, 0.1))));
        assert_eq!(selection.best().unwrap().name, "third");
    }

    #[test]
    fn test_run_trains_three_candidates() {
        let train = split(60, 0);
        let test = split(20, 1000);
        let mut trainer = ModelTrainer::new(TrainerConfig::quick(44));
        let outcome = trainer.run(&train, &test).unwrap();

        assert_eq!(trainer.stage(), TrainingStage::Selected);
        let names: Vec<&str> = outcome.evaluated.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, [RANDOM_FOREST, LOGISTIC_REGRESSION, TUNED_BOOSTING]);
        assert_eq!(outcome.runs.len(), 3);
        assert!(outcome.runs[2].metrics.contains_key("cv_auc"));
        assert_eq!(outcome.search.trials.len(), 3);
        assert_eq!(outcome.selected.confusion_matrix.total(), test.len());
        assert!(names.contains(&outcome.selected.name.as_str()));
    }

    #[test]
    fn test_empty_train_split() {
        let mut trainer = ModelTrainer::new(TrainerConfig::quick(1));
        assert!(trainer.run(&LabeledSplit::default(), &split(4, 0)).is_err());
    }
}
