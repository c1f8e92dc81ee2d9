//! Demo that runs a batch of sample comments through the deterministic path
//! (model backends disabled), printing category, context, and reply.

use comment_triage::{CommentProcessor, Profiles};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    let processor = CommentProcessor::deterministic(Profiles::builtin());

    let samples = [
        "That devotional had me tearing up at my desk... again!",
        "I'm crying. This was so powerful.",
        "This feels like it was written just for me.",
        "How can I get this devotional?",
        "I want to believe in God again. But I don't know where to start.",
        "I'm struggling to believe this applies to me.",
        "How do I know this is true for me?",
        "Why is this speaking to me louder than my morning coffee?",
        "This is such fake spiritual fluff. Y'all just want attention.",
        "I want to believe this, but it feels like God's silent in my life.",
        "This really spoke to me.",
        "Your words always uplift me.",
        "This made me feel seen for the first time in a while.",
    ];

    for (i, comment) in samples.iter().enumerate() {
        match processor.process(comment).await {
            Ok(result) => {
                println!("#{:02} [{}] ({})", i + 1, result.category, result.context);
                println!("    comment: {comment}");
                println!("    reply:   {}", result.reply);
            }
            Err(e) => println!("#{:02} error: {e}", i + 1),
        }
    }

    println!("triage-demo done");
}
