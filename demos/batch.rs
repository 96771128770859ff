/// Batch prediction example
///
/// Run with:
/// ```
/// cargo run --example batch
/// ```
use lda_roberta::api::Predictor;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("LDA + RoBERTa Clickbait Classifier - Batch Prediction Example\n");

    let predictor = Predictor::new()?;
    println!("✓ Model loaded\n");

    let texts = vec![
        "This simple morning habit changed everything for me",
        "Parliament votes to extend emergency powers by six months",
        "Doctors hate him: the secret to perfect sleep",
        "Quarterly earnings beat analyst expectations at major retailer",
        "What happened when she opened the box will leave you speechless",
        "Storm warning issued for coastal regions through Friday",
        "Only people born in the 90s will understand these photos",
        "University researchers publish study on soil bacteria",
    ];

    println!("Predicting {} texts in batch...\n", texts.len());

    let start = Instant::now();
    let results = predictor.predict_batch(&texts)?;
    let elapsed = start.elapsed();

    println!("{}", "=".repeat(90));
    println!("{:<55} | {:^14} | {:>8}", "Text (truncated)", "Label", "Conf %");
    println!("{}", "=".repeat(90));

    for (text, result) in texts.iter().zip(results.iter()) {
        let truncated = match text.char_indices().nth(52) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        };

        println!(
            "{:<55} | {:^14} | {:>7.1}%",
            truncated,
            result.label,
            result.confidence() * 100.0
        );
    }

    println!("{}", "=".repeat(90));
    println!("\n✓ Batch prediction complete");
    println!(
        "  Time: {:.2}ms ({:.2}ms per text)",
        elapsed.as_secs_f64() * 1000.0,
        elapsed.as_secs_f64() * 1000.0 / texts.len() as f64
    );

    Ok(())
}
