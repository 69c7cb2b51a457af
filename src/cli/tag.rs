//! CLI entry-point for entity listing.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{
    config::Settings,
    nlp::{
        ner::{CrfTagger, Ner},
        normalize::NameDictionary,
    },
};

/// Args for the `tag` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Text to tag.
    #[arg(long)]
    pub text: String,
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let tagger = CrfTagger::load(&settings.tagger_model)?;
    let dictionary = NameDictionary::load_or_empty(&settings.name_dict)?;
    let entities = dictionary.normalize(&args.text, &tagger.entities(&args.text));
    println!("{}", entities.join(", "));
    Ok(())
}
