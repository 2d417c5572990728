use crate::asynchronous::{
    example_cancel_from_task, example_deadline_retry, example_retry_with_data,
};

mod asynchronous;

#[tokio::main]
async fn main() {
    println!("Running retry with deadline example:");
    example_deadline_retry().await;

    println!("\nRunning retry with data example:");
    example_retry_with_data().await;

    println!("\nRunning cancellation example:");
    example_cancel_from_task().await;
}
