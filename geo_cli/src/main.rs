//! `geo` - record field surveys and turn them into geological maps.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use geo_core::{
    CatalogFile, CategoryInferencer, Classification, GeoConfig, JsonRenderer, KnowledgeBase,
    KnowledgeSource, MapGenerator, Record, RecordKind,
};
use survey_model::{Description, SurveyId, SurveyPoint, SurveyStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "geo.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new, empty survey
    NewSurvey {
        /// Geological formation the survey belongs to
        #[arg(long)]
        formation: Option<String>,
    },
    /// Append a point given as "lat,lon,elevation"
    AddPoint {
        survey: String,
        #[arg(allow_hyphen_values = true)]
        point: String,
    },
    /// Describe an existing point and infer its rock or mineral
    AddDescription {
        survey: String,
        index: usize,
        text: String,
        /// Label reported by the image classifier for this sample
        #[arg(long)]
        label: Option<String>,
        /// Classifier confidence in [0, 1], 1.0 when omitted
        #[arg(long, requires = "label")]
        confidence: Option<f64>,
    },
    /// Print a survey as JSON
    Show { survey: String },
    /// Query the knowledge base, e.g. "hardness > 5 AND color == 'white'"
    Search {
        expression: String,
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },
    /// Print the catalog entry for a rock or mineral
    Identify { name: String },
    /// Generate and render the map for a survey
    GenerateMap { survey: String },
    /// Merge new records from a catalog file into the learned catalog
    Update {
        #[arg(long = "from")]
        source: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Mineral,
    Rock,
}

impl From<KindArg> for RecordKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Mineral => RecordKind::Mineral,
            KindArg::Rock => RecordKind::Rock,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = GeoConfig::load(&args.config)
        .with_context(|| format!("loading configuration {}", args.config.display()))?;

    match args.cmd {
        Command::NewSurvey { formation } => new_survey(&config, formation),
        Command::AddPoint { survey, point } => add_point(&config, &survey, &point),
        Command::AddDescription {
            survey,
            index,
            text,
            label,
            confidence,
        } => {
            let classification = label.map(|label| Classification::new(label, confidence.unwrap_or(1.0)));
            add_description(&config, &survey, index, &text, classification.as_ref())
        }
        Command::Show { survey } => show(&config, &survey),
        Command::Search { expression, kind } => search(&config, &expression, kind),
        Command::Identify { name } => identify(&config, &name),
        Command::GenerateMap { survey } => generate_map(&config, &survey),
        Command::Update { source } => update(&config, &source),
    }
}

fn open_store(config: &GeoConfig) -> Result<SurveyStore> {
    SurveyStore::open(&config.data_dir)
        .with_context(|| format!("opening survey store {}", config.data_dir.display()))
}

fn parse_id(raw: &str) -> Result<SurveyId> {
    SurveyId::parse(raw).with_context(|| format!("invalid survey id {raw:?}"))
}

/// Configured catalogs plus the learned catalog; missing files are skipped.
fn load_knowledge(config: &GeoConfig) -> Result<KnowledgeBase> {
    let paths: Vec<&Path> = config
        .knowledge
        .sources
        .iter()
        .chain(std::iter::once(&config.knowledge.learned))
        .map(PathBuf::as_path)
        .filter(|path| {
            let exists = path.exists();
            if !exists {
                tracing::warn!(path = %path.display(), "Catalog file not found, skipping");
            }
            exists
        })
        .collect();
    KnowledgeBase::load_files(paths).context("loading knowledge base")
}

fn new_survey(config: &GeoConfig, formation: Option<String>) -> Result<()> {
    let mut store = open_store(config)?;
    let id = match formation {
        Some(formation) => store.create_survey_with_formation(formation).id().clone(),
        None => store.create_survey().id().clone(),
    };
    store.persist(&id)?;
    println!("{id}");
    Ok(())
}

fn add_point(config: &GeoConfig, survey: &str, point: &str) -> Result<()> {
    let id = parse_id(survey)?;
    let point = SurveyPoint::parse_triple(point)?;
    let mut store = open_store(config)?;
    let index = store.append_point(&id, point.lat, point.lon, point.elevation)?;
    store.persist(&id)?;
    println!("Added point {index} to {id}");
    Ok(())
}

fn add_description(
    config: &GeoConfig,
    survey: &str,
    index: usize,
    text: &str,
    classification: Option<&Classification>,
) -> Result<()> {
    let id = parse_id(survey)?;
    let mut store = open_store(config)?;
    let kb = load_knowledge(config)?;
    let inferencer = CategoryInferencer::new(config.inference.clone());

    let description_index = store.append_description(&id, index, text)?;
    let inferred =
        inferencer.infer_with_classification(&Description::new(index, text), &kb, classification);
    store.set_inferred_type(
        &id,
        description_index,
        inferred.as_ref().map(|i| i.category.clone()),
    )?;
    store.persist(&id)?;

    match inferred {
        Some(inference) => {
            println!(
                "Inferred type: {} (confidence {:.2}, from {:?})",
                inference.category, inference.confidence, inference.source
            );
            if let Some((kind, record)) = kb.find(&inference.category) {
                print_record(kind, record);
            }
        }
        None => println!("Inferred type: unknown"),
    }
    Ok(())
}

fn identify(config: &GeoConfig, name: &str) -> Result<()> {
    let kb = load_knowledge(config)?;
    let (kind, record) = kb.require(name)?;
    print_record(kind, record);
    Ok(())
}

fn show(config: &GeoConfig, survey: &str) -> Result<()> {
    let id = parse_id(survey)?;
    let store = open_store(config)?;
    println!("{}", store.get(&id)?.to_json()?);
    Ok(())
}

fn search(config: &GeoConfig, expression: &str, kind: Option<KindArg>) -> Result<()> {
    let kb = load_knowledge(config)?;
    let kinds = match kind {
        Some(kind) => vec![RecordKind::from(kind)],
        None => RecordKind::ALL.to_vec(),
    };

    let mut total = 0;
    for kind in kinds {
        let results = kb
            .search_in(kind, expression)
            .with_context(|| format!("invalid query {expression:?}"))?;
        total += results.len();
        for record in results {
            print_record(kind, record);
        }
    }
    if total == 0 {
        println!("No records match.");
    }
    Ok(())
}

fn generate_map(config: &GeoConfig, survey: &str) -> Result<()> {
    let id = parse_id(survey)?;
    let mut store = open_store(config)?;
    let kb = load_knowledge(config)?;
    let generator = MapGenerator::new(
        config.map.clone(),
        CategoryInferencer::new(config.inference.clone()),
    );

    let artifact = generator
        .generate(store.get(&id)?, &kb)
        .with_context(|| format!("generating map for {id}"))?;
    for inference in &artifact.inferences {
        store.set_inferred_type(&id, inference.description_index, inference.inferred_type.clone())?;
    }
    store.persist(&id)?;

    let path = generator.render(&artifact, &JsonRenderer::new(&config.output_dir))?;
    println!("Map written to {}", path.display());
    Ok(())
}

fn update(config: &GeoConfig, source: &Path) -> Result<()> {
    let source = CatalogFile::new(source);
    let document = source
        .fetch()
        .with_context(|| format!("reading {}", source.name()))?;
    if document.is_empty() {
        bail!("{} contains no records", source.name());
    }

    // Conflicts are checked against every catalog before the learned one changes.
    let mut kb = load_knowledge(config)?;
    let report = kb.merge(document.clone())?;

    let learned_path = &config.knowledge.learned;
    let mut learned = if learned_path.exists() {
        KnowledgeBase::load_files([learned_path])?
    } else {
        KnowledgeBase::new()
    };
    learned.merge(document)?;
    learned.to_document().write(learned_path)?;

    println!(
        "Added {} records ({} already known)",
        report.added, report.unchanged
    );
    Ok(())
}

fn print_record(kind: RecordKind, record: &Record) {
    println!("{} ({kind})", record.name);
    for (attribute, value) in &record.attributes {
        println!("  {attribute}: {value}");
    }
}
