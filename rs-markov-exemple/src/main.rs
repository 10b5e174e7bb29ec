use rs_markov_core::model::{ChainConfig, GenerateOptions, MarkovChain, Metadata};
use rs_markov_core::tokenizer::PatternTokenizer;
use rs_markov_core::ChainError;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Window size 1: every word is a token.
    // The pattern tokenizer keeps urls, mentions and numbers whole
    let config = ChainConfig::new(1)?.with_tokenizer(PatternTokenizer::new()?);

    // Load every .txt file of the "data" directory, one sentence per line.
    // Start from a few hand-written sentences if there is none
    let mut chain = match MarkovChain::from_folder("./data", config.clone()) {
        Ok(chain) if !chain.is_empty() => chain,
        _ => {
            let mut chain = MarkovChain::new(config);
            let added = chain.add_strings(
                [
                    "The quick brown fox jumps over the lazy dog.",
                    "A lazy afternoon makes the dog sleep.",
                    "The fox runs away before the afternoon ends.",
                    "Every dog jumps when the fox comes back!",
                ],
                &Metadata::new(),
            );
            println!("Indexed {added} built-in sentences");
            chain
        }
    };

    // Empty input is reported and leaves the chain untouched
    match chain.add_string("   ", Metadata::new()) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Rejected: {e}"),
    }

    log::info!("Chain ready: {:?}", chain.stats());

    // Default options: random start word, 20 attempts, at least 2 words
    let mut input = GenerateOptions::new();

    // At least one attempt is required
    match input.set_max_retries(0) {
        Ok(_) => println!("Should not happen"),
        Err(_) => println!("0 retries is invalid, must be at least 1"),
    }

    for i in 0..5 {
        println!("Generated sentence {}: {}", i + 1, chain.generate(&input)?.text);
    }

    // Seeded generation: the first known word of the seed text is used
    input.seed = Some("lazy".to_owned());
    input.set_min_words(4);
    let sentence = chain.generate(&input)?;
    println!("Seeded with 'lazy': {} ({} sources)", sentence.text, sentence.refs.len());

    // An unreachable predicate exhausts the attempts
    input.set_max_retries(3)?;
    input.set_min_words(1000);
    match chain.generate(&input) {
        Err(ChainError::GenerationExhausted { attempts }) => println!("Gave up after {attempts} attempts"),
        other => println!("Should not happen: {other:?}"),
    }

    Ok(())
}
