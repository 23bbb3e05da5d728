#![no_main]

use libfuzzer_sys::fuzz_target;
use libsift::config::SiftConfig;
use libsift::corpus::Corpus;
use libsift::decision_log::DecisionLog;
use libsift::pipeline;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed corpora must be rejected with an error, never a panic
        if let Ok(mut corpus) = Corpus::from_json_str(input) {
            let _ = pipeline::run(&mut corpus, &SiftConfig::default(), &mut DecisionLog::disabled());
        }
    }
});
