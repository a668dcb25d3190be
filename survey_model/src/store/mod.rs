//! Survey store - owns every survey and is the only place they are mutated.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::{Description, Result, Survey, SurveyError, SurveyId, SurveyPoint};

/// Extension used for persisted survey documents.
const SURVEY_FILE_EXTENSION: &str = "json";

/// The complete set of surveys known to this process.
///
/// Appends to one survey are serialized through `&mut self`; callers sharing a
/// store across threads wrap it in a lock.
#[derive(Debug)]
pub struct SurveyStore {
    /// Directory holding one `<id>.json` document per persisted survey.
    data_dir: PathBuf,

    /// All surveys by id.
    surveys: BTreeMap<SurveyId, Survey>,

    /// Sequence number handed to the next created survey.
    next_sequence: u32,
}

impl SurveyStore {
    /// Create an empty store persisting into `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            surveys: BTreeMap::new(),
            next_sequence: 1,
        }
    }

    /// Open a store and restore every survey already persisted in `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(data_dir);
        if !store.data_dir.exists() {
            return Ok(store);
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&store.data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SURVEY_FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match SurveyId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(e) => skip_document(&path, &e),
            }
        }
        ids.sort();

        for id in ids {
            match store.restore(&id) {
                Ok(_) => {}
                Err(SurveyError::Io(e)) => return Err(SurveyError::Io(e)),
                Err(e) => skip_document(&store.survey_path(&id), &e),
            }
        }
        tracing::info!(
            target: "geo::survey",
            dir = %store.data_dir.display(),
            surveys = store.surveys.len(),
            "Survey store opened"
        );
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Register a new empty survey under the next sequential id, dated today.
    pub fn create_survey(&mut self) -> &Survey {
        self.register(None)
    }

    /// Register a new empty survey that records its geological formation.
    pub fn create_survey_with_formation(&mut self, formation: impl Into<String>) -> &Survey {
        let formation = formation.into();
        let formation = formation.trim();
        self.register((!formation.is_empty()).then(|| formation.to_string()))
    }

    fn register(&mut self, formation: Option<String>) -> &Survey {
        let id = self.allocate_id();
        let mut survey = Survey::new(id.clone());
        survey.formation = formation;
        survey.date = Some(Local::now().date_naive());
        tracing::info!(target: "geo::survey", survey = %id, "Survey created");
        self.surveys.entry(id).or_insert(survey)
    }

    /// Get survey by ID.
    pub fn get(&self, id: &SurveyId) -> Result<&Survey> {
        self.surveys
            .get(id)
            .ok_or_else(|| SurveyError::NotFound(id.clone()))
    }

    fn get_mut(&mut self, id: &SurveyId) -> Result<&mut Survey> {
        self.surveys
            .get_mut(id)
            .ok_or_else(|| SurveyError::NotFound(id.clone()))
    }

    /// All registered survey ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &SurveyId> {
        self.surveys.keys()
    }

    pub fn len(&self) -> usize {
        self.surveys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surveys.is_empty()
    }

    /// Append a validated point and return its index.
    pub fn append_point(
        &mut self,
        id: &SurveyId,
        lat: f64,
        lon: f64,
        elevation: f64,
    ) -> Result<usize> {
        let point = SurveyPoint::new(lat, lon, elevation)?;
        let survey = self.get_mut(id)?;
        survey.coordinates.push(point);
        Ok(survey.coordinates.len() - 1)
    }

    /// Append a description referencing an existing point and return its index.
    pub fn append_description(
        &mut self,
        id: &SurveyId,
        location_index: usize,
        text: impl Into<String>,
    ) -> Result<usize> {
        let survey = self.get_mut(id)?;
        let len = survey.coordinates.len();
        if location_index >= len {
            return Err(SurveyError::Index {
                survey: id.clone(),
                index: location_index,
                len,
            });
        }
        survey
            .descriptions
            .push(Description::new(location_index, text));
        Ok(survey.descriptions.len() - 1)
    }

    /// Write back the result of category inference for one description.
    pub fn set_inferred_type(
        &mut self,
        id: &SurveyId,
        description_index: usize,
        inferred_type: Option<String>,
    ) -> Result<()> {
        let survey = self.get_mut(id)?;
        let len = survey.descriptions.len();
        let description =
            survey
                .descriptions
                .get_mut(description_index)
                .ok_or_else(|| SurveyError::Index {
                    survey: id.clone(),
                    index: description_index,
                    len,
                })?;
        description.inferred_type = inferred_type;
        Ok(())
    }

    /// Path of the persisted document for `id`.
    pub fn survey_path(&self, id: &SurveyId) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", id.as_str(), SURVEY_FILE_EXTENSION))
    }

    /// Write the survey to its canonical JSON document.
    pub fn persist(&self, id: &SurveyId) -> Result<PathBuf> {
        let survey = self.get(id)?;
        let json = survey.to_json()?;

        fs::create_dir_all(&self.data_dir)?;
        let path = self.survey_path(id);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json)?;
        fs::rename(&staging, &path)?;

        tracing::info!(
            target: "geo::survey",
            survey = %id,
            points = survey.coordinates.len(),
            descriptions = survey.descriptions.len(),
            path = %path.display(),
            "Survey persisted"
        );
        Ok(path)
    }

    /// Write every registered survey.
    pub fn persist_all(&self) -> Result<Vec<PathBuf>> {
        self.surveys.keys().map(|id| self.persist(id)).collect()
    }

    /// Load the survey's JSON document, replacing any in-memory copy.
    pub fn restore(&mut self, id: &SurveyId) -> Result<&Survey> {
        let path = self.survey_path(id);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SurveyError::NotFound(id.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let survey = Survey::from_json(&json)?;
        if survey.id != *id {
            return Err(SurveyError::Validation(format!(
                "{} holds survey {}, expected {}",
                path.display(),
                survey.id,
                id
            )));
        }

        if let Some(sequence) = id.sequence() {
            self.next_sequence = self.next_sequence.max(sequence.saturating_add(1));
        }
        tracing::debug!(target: "geo::survey", survey = %id, "Survey restored");
        self.surveys.insert(id.clone(), survey);
        self.get(id)
    }

    fn allocate_id(&mut self) -> SurveyId {
        loop {
            let id = SurveyId::from_sequence(self.next_sequence);
            self.next_sequence += 1;
            if !self.surveys.contains_key(&id) {
                return id;
            }
        }
    }
}

fn skip_document(path: &Path, error: &SurveyError) {
    tracing::warn!(
        target: "geo::survey",
        path = %path.display(),
        error = %error,
        "Skipping unreadable survey document"
    );
}
