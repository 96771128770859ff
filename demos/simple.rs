/// Simple example of using the lda-roberta library
///
/// Requires a trained model in `saved_model_roberta/` (`lda-roberta train`).
///
/// Run with:
/// ```
/// cargo run --example simple
/// ```
use lda_roberta::api::Predictor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("LDA + RoBERTa Clickbait Classifier - Simple Example\n");

    println!("Loading model...");
    let predictor = Predictor::new()?;

    let info = predictor.model_info();
    println!("✓ Model loaded on: {}\n", info.device);

    let examples = vec![
        "You won't believe what this golden retriever did at the airport",
        "Central bank leaves interest rates unchanged for third quarter",
        "17 photos that prove cats are secretly plotting against us",
        "City council approves budget for new water treatment plant",
    ];

    println!("Making predictions...\n");
    println!("{}", "=".repeat(70));

    for text in examples {
        let result = predictor.predict(text)?;

        println!("\nText: \"{}\"", text);
        println!(
            "Predicted: {} (confidence: {:.1}%)",
            result.label,
            result.confidence() * 100.0
        );

        println!("Probabilities:");
        for (label, p) in &result.probabilities {
            println!("  {:<14} {:.1}%", label, p * 100.0);
        }
        println!("{}", "-".repeat(70));
    }

    println!("\n✓ Done!");

    Ok(())
}
