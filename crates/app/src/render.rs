use prep_core::ResultsSummary;
use prep_core::model::{AnswerLetter, SessionState, TestDefinition};
use prep_core::scoring::plain_text;
use services::SessionProgress;

/// Question screen with options and the actions currently on offer.
pub fn question(test: &TestDefinition, state: &SessionState) {
    let index = state.current_question_index();
    let Some(question) = test.question(index) else {
        return;
    };
    let progress = SessionProgress::from_state(state);

    println!();
    println!(
        "Question {}/{}  ({}s per question)",
        progress.current,
        progress.total,
        state.seconds_per_question()
    );
    println!("{}", plain_text(question.prompt()));
    for letter in AnswerLetter::ALL {
        let marker = if state.selected_option() == Some(letter.index()) {
            '>'
        } else {
            ' '
        };
        println!(
            " {marker} {letter}) {}",
            plain_text(question.option(letter))
        );
    }
    actions(state);
}

/// Feedback after an answer was locked.
pub fn locked(test: &TestDefinition, state: &SessionState) {
    let index = state.current_question_index();
    let (Some(question), Some(answer)) = (test.question(index), state.answers().get(index)) else {
        return;
    };
    if answer.status.is_answered() {
        println!(
            "  {} (correct answer: {})",
            answer.status.as_str(),
            question.correct_answer()
        );
    }
    actions(state);
}

pub fn timer(state: &SessionState) {
    let left = state.time_left();
    if left <= 5 || left % 10 == 0 {
        println!("  {left}s left");
    }
}

pub fn error(state: &SessionState) {
    if let Some(error) = state.error() {
        println!("  ! {} (retry in {}s)", error.message, error.clears_in);
    }
}

fn actions(state: &SessionState) {
    let buttons = state.buttons();
    let mut offered = Vec::new();
    if !state.is_locked() {
        offered.push("a-d answer");
    }
    if buttons.skip {
        offered.push("s skip");
    }
    if buttons.next {
        offered.push("n next");
    }
    if buttons.submit {
        offered.push("submit");
    }
    offered.push("q quit");
    println!("  [{}]", offered.join(", "));
}

pub fn results(test: &TestDefinition, summary: &ResultsSummary) {
    println!();
    println!("Results for {}", test.name());
    println!(
        "  score {}/{}  accuracy {}%",
        summary.score, summary.question_count, summary.accuracy
    );
    println!(
        "  answered {}  correct {}  wrong {}  skipped {}",
        summary.answered, summary.correct, summary.wrong, summary.skipped
    );
    println!(
        "  total {}s  avg {:.1}s per question  avg {:.1}s per correct answer",
        summary.total_time, summary.avg_time_per_question, summary.avg_time_per_correct_answer
    );
    for (i, detail) in summary.question_details.iter().enumerate() {
        println!(
            "  {:>3}. {:<10} {:<6} {:>3}s  {}",
            i + 1,
            detail.status.as_str(),
            detail.difficulty.as_str(),
            detail.time,
            detail.snippet
        );
    }
}
