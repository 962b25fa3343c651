// src/workflow.rs
use std::fmt;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::appliance::{Appliance, ReportStatus, TaskStatus};
use crate::banner;
use crate::config::{Credentials, PollConfig};
use crate::console::Console;
use crate::verdict::Verdict;

/// The step of the workflow that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Upload,
    Analysis,
    Report,
    Profiles,
}

impl Stage {
    pub fn exit_code(self) -> i32 {
        match self {
            Stage::Connect => -1,
            Stage::Upload => -2,
            Stage::Analysis => -3,
            Stage::Report => -4,
            Stage::Profiles => -5,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Connect => write!(f, "connect"),
            Stage::Upload => write!(f, "upload"),
            Stage::Analysis => write!(f, "analysis"),
            Stage::Report => write!(f, "report"),
            Stage::Profiles => write!(f, "profile listing"),
        }
    }
}

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Verdict),
    /// The appliance said no report will exist. Exits 0, like severity 0.
    ReportNotAvailable,
    ProfilesListed,
    Failed(Stage),
}

impl Outcome {
    /// Process exit code: the severity on success, a negative stage code on failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Completed(verdict) => i32::from(verdict.severity),
            Outcome::ReportNotAvailable | Outcome::ProfilesListed => 0,
            Outcome::Failed(stage) => stage.exit_code(),
        }
    }
}

/// Blocking delay between polls.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// Delays for the status loop: grows by `status_step` per poll up to `status_max`.
#[derive(Debug, Clone)]
pub struct StatusBackoff {
    next: Duration,
    step: Duration,
    max: Duration,
}

impl StatusBackoff {
    pub fn new(poll: &PollConfig) -> Self {
        Self {
            next: poll.status_initial.min(poll.status_max),
            step: poll.status_step,
            max: poll.status_max,
        }
    }
}

impl Iterator for StatusBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.next;
        self.next = (self.next + self.step).min(self.max);
        Some(delay)
    }
}

/// Connect, upload, poll and read the verdict against one appliance.
pub struct Workflow<'a, A, S, W: Write> {
    appliance: &'a mut A,
    sleeper: &'a S,
    console: &'a mut Console<W>,
    poll: PollConfig,
}

impl<'a, A, S, W> Workflow<'a, A, S, W>
where
    A: Appliance,
    S: Sleeper,
    W: Write,
{
    pub fn new(appliance: &'a mut A, sleeper: &'a S, console: &'a mut Console<W>) -> Self {
        Self {
            appliance,
            sleeper,
            console,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Submits `sample` under `profile` and waits for its verdict.
    ///
    /// Once connected, the session is closed exactly once whatever the outcome.
    pub async fn submit(&mut self, credentials: &Credentials, sample: &Path, profile: &str) -> Outcome {
        if !self.connect(credentials).await {
            return Outcome::Failed(Stage::Connect);
        }
        let outcome = self.analyze(sample, profile).await;
        self.disconnect().await;
        log::info!("Submission finished with exit code {}", outcome.exit_code());
        outcome
    }

    /// Prints the analyzer profiles available to this user.
    pub async fn list_profiles(&mut self, credentials: &Credentials) -> Outcome {
        if !self.connect(credentials).await {
            return Outcome::Failed(Stage::Connect);
        }
        let outcome = match self.appliance.list_profiles().await {
            Ok(profiles) => {
                self.console.always(format_args!("{:>6}  {:<30}  {}", "Id", "Name", "Description"));
                for profile in &profiles {
                    self.console.always(format_args!(
                        "{:>6}  {:<30}  {}",
                        profile.id, profile.name, profile.description
                    ));
                }
                Outcome::ProfilesListed
            }
            Err(e) => {
                self.console.always(format_args!("{}", e));
                Outcome::Failed(Stage::Profiles)
            }
        };
        self.disconnect().await;
        outcome
    }

    async fn connect(&mut self, credentials: &Credentials) -> bool {
        self.console.say(1, format_args!("{}", banner::notice()));

        match self.appliance.connect(&credentials.user, &credentials.password).await {
            Ok(session) => {
                self.console.say(2, format_args!("Connection successful...\n"));
                self.console.say(2, format_args!("Session Value:     {}", session.token));
                self.console.say(2, format_args!("User ID:           {}", session.user_id));
                self.console.say(2, format_args!("ATD ver:           {}", session.version));
                true
            }
            Err(e) => {
                self.console.always(format_args!("{}", e));
                false
            }
        }
    }

    async fn analyze(&mut self, sample: &Path, profile: &str) -> Outcome {
        match self.appliance.heartbeat().await {
            Ok(value) => self.console.say(2, format_args!("ATD Box heartbeat: {}", value)),
            Err(e) => {
                log::warn!("Heartbeat failed: {}", e);
                self.console.say(2, format_args!("ATD Box heartbeat: Error Obtaining value"));
            }
        }

        let upload = match self.appliance.upload_file(sample, profile).await {
            Ok(upload) => upload,
            Err(e) => {
                self.console.always(format_args!("{}", e));
                return Outcome::Failed(Stage::Upload);
            }
        };

        if self.console.enabled(3) {
            let raw = serde_json::to_string_pretty(&upload).unwrap_or_default();
            self.console.say(3, format_args!("{}", raw));
        }
        self.console.say(1, format_args!("\nFile {} uploaded\n", upload.file));
        self.console.say(1, format_args!("jobId:     {}", upload.job_id));
        self.console.say(1, format_args!("taskId:    {}", upload.task_id));
        self.console.say(1, format_args!("md5:       {}", upload.md5));
        self.console.say(1, format_args!("size:      {}", upload.size));
        self.console.say(1, format_args!("mimeType:  {}\n", upload.mime_type));

        if let Err(stage) = self.wait_for_analysis(&upload.task_id).await {
            return Outcome::Failed(stage);
        }
        self.fetch_verdict(&upload.job_id).await
    }

    async fn wait_for_analysis(&mut self, task_id: &str) -> Result<(), Stage> {
        let mut backoff = StatusBackoff::new(&self.poll);
        loop {
            match self.appliance.check_status(task_id).await {
                Ok(TaskStatus::Running(message)) => {
                    let delay = backoff.next().unwrap_or(self.poll.status_max);
                    if self.console.enabled(1) {
                        self.console.say(
                            1,
                            format_args!("{} - Waiting for {} seconds", message, delay.as_secs()),
                        );
                    } else {
                        self.console.progress();
                    }
                    self.sleeper.sleep(delay).await;
                }
                Ok(TaskStatus::Done) => {
                    self.console.say(1, format_args!("\nAnalysis done"));
                    return Ok(());
                }
                Ok(TaskStatus::Failed(message)) => {
                    self.console.always(format_args!("{}", message));
                    return Err(Stage::Analysis);
                }
                Err(e) => {
                    self.console.always(format_args!("{}", e));
                    return Err(Stage::Analysis);
                }
            }
        }
    }

    async fn fetch_verdict(&mut self, job_id: &str) -> Outcome {
        self.console.say(1, format_args!("\nGetting report information..."));
        loop {
            match self.appliance.get_report(job_id).await {
                Ok(ReportStatus::Available(report)) => return self.read_verdict(&report),
                Ok(ReportStatus::Pending(message)) => {
                    self.console.say(
                        1,
                        format_args!(
                            " {} - Waiting for {} seconds...",
                            message,
                            self.poll.report_interval.as_secs()
                        ),
                    );
                    self.sleeper.sleep(self.poll.report_interval).await;
                }
                Ok(ReportStatus::NotAvailable(message)) => {
                    self.console.always(format_args!("\n {}", message));
                    return Outcome::ReportNotAvailable;
                }
                Err(e) => {
                    self.console.always(format_args!("\n {}", e));
                    return Outcome::Failed(Stage::Report);
                }
            }
        }
    }

    fn read_verdict(&mut self, report: &Value) -> Outcome {
        match Verdict::from_report(report) {
            Ok(verdict) => {
                self.console.say(1, format_args!("\nFinal results..."));
                self.console.say(1, format_args!(" Severity:    {}", verdict.severity));
                self.console.say(1, format_args!(" Description: {}", verdict.description));
                if self.console.enabled(2) {
                    let pretty = serde_json::to_string_pretty(report).unwrap_or_else(|_| report.to_string());
                    self.console.say(2, format_args!("{}", pretty));
                }
                Outcome::Completed(verdict)
            }
            Err(e) => {
                self.console.always(format_args!("\nCould not read the verdict: {}", e));
                self.console.always(format_args!("{}", report));
                Outcome::Failed(Stage::Report)
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.appliance.disconnect().await {
            log::warn!("Disconnect failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appliance::{Session, UploadResult, VmProfile};
    use crate::errors::{AtdError, Result};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedAppliance {
        fail_connect: bool,
        fail_heartbeat: bool,
        fail_upload: bool,
        fail_profiles: bool,
        statuses: Mutex<VecDeque<Result<TaskStatus>>>,
        reports: Mutex<VecDeque<Result<ReportStatus>>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedAppliance {
        fn with_script(statuses: Vec<Result<TaskStatus>>, reports: Vec<Result<ReportStatus>>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                reports: Mutex::new(reports.into()),
                ..Self::default()
            }
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls().iter().filter(|c| **c == call).count()
        }
    }

    impl Appliance for ScriptedAppliance {
        async fn connect(&mut self, _user: &str, _password: &str) -> Result<Session> {
            self.record("connect");
            if self.fail_connect {
                return Err(AtdError::ApiResponse("Invalid credentials".to_string()));
            }
            Ok(Session {
                token: "tok".to_string(),
                user_id: "7".to_string(),
                version: "4.2.0".to_string(),
            })
        }

        async fn heartbeat(&self) -> Result<Value> {
            self.record("heartbeat");
            if self.fail_heartbeat {
                return Err(AtdError::ApiError { status: 503, body: "busy".to_string() });
            }
            Ok(json!(1))
        }

        async fn upload_file(&self, _path: &Path, _profile: &str) -> Result<UploadResult> {
            self.record("upload");
            if self.fail_upload {
                return Err(AtdError::ApiResponse("upload rejected".to_string()));
            }
            Ok(UploadResult {
                job_id: "J1".to_string(),
                task_id: "T1".to_string(),
                file: "a.exe".to_string(),
                md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
                size: 1024,
                mime_type: "application/x-msdownload".to_string(),
            })
        }

        async fn check_status(&self, task_id: &str) -> Result<TaskStatus> {
            assert_eq!(task_id, "T1");
            self.record("status");
            self.statuses.lock().unwrap().pop_front().expect("status script exhausted")
        }

        async fn get_report(&self, job_id: &str) -> Result<ReportStatus> {
            assert_eq!(job_id, "J1");
            self.record("report");
            self.reports.lock().unwrap().pop_front().expect("report script exhausted")
        }

        async fn list_profiles(&self) -> Result<Vec<VmProfile>> {
            self.record("profiles");
            if self.fail_profiles {
                return Err(AtdError::ApiError { status: 500, body: "db down".to_string() });
            }
            Ok(vec![VmProfile {
                id: "24".to_string(),
                name: "Win10 x64".to_string(),
                description: "Windows 10".to_string(),
            }])
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.record("disconnect");
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn secs(&self) -> Vec<u64> {
            self.delays.lock().unwrap().iter().map(|d| d.as_secs()).collect()
        }
    }

    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            user: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    fn running(text: &str) -> Result<TaskStatus> {
        Ok(TaskStatus::Running(text.to_string()))
    }

    fn verdict_report(severity: u8, description: &str) -> Result<ReportStatus> {
        Ok(ReportStatus::Available(json!({
            "Summary": {"Verdict": {"Severity": severity, "Description": description}}
        })))
    }

    async fn run(appliance: &mut ScriptedAppliance, sleeper: &RecordingSleeper, verbosity: u8) -> (Outcome, String) {
        let mut console = Console::new(Vec::new(), verbosity, false);
        let outcome = Workflow::new(appliance, sleeper, &mut console)
            .submit(&credentials(), Path::new("a.exe"), "24")
            .await;
        (outcome, String::from_utf8(console.into_inner()).unwrap())
    }

    #[test]
    fn test_status_backoff_sequence() {
        let delays: Vec<u64> = StatusBackoff::new(&PollConfig::default())
            .take(9)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![5, 10, 15, 20, 25, 30, 30, 30, 30]);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Failed(Stage::Connect).exit_code(), -1);
        assert_eq!(Outcome::Failed(Stage::Upload).exit_code(), -2);
        assert_eq!(Outcome::Failed(Stage::Analysis).exit_code(), -3);
        assert_eq!(Outcome::Failed(Stage::Report).exit_code(), -4);
        assert_eq!(Outcome::Failed(Stage::Profiles).exit_code(), -5);
        assert_eq!(Outcome::ReportNotAvailable.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_stops_before_upload() {
        let mut appliance = ScriptedAppliance { fail_connect: true, ..Default::default() };
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 0).await;

        assert_eq!(outcome.exit_code(), -1);
        assert_eq!(appliance.calls(), vec!["connect"]);
        assert!(out.contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_upload_failure_disconnects() {
        let mut appliance = ScriptedAppliance { fail_upload: true, ..Default::default() };
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 0).await;

        assert_eq!(outcome.exit_code(), -2);
        assert_eq!(appliance.calls(), vec!["connect", "heartbeat", "upload", "disconnect"]);
        assert!(out.contains("upload rejected"));
    }

    #[tokio::test]
    async fn test_heartbeat_failure_is_not_fatal() {
        let mut appliance = ScriptedAppliance {
            fail_heartbeat: true,
            ..ScriptedAppliance::with_script(vec![Ok(TaskStatus::Done)], vec![verdict_report(1, "")])
        };
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 2).await;

        assert_eq!(outcome.exit_code(), 1);
        assert!(out.contains("ATD Box heartbeat: Error Obtaining value"));
    }

    #[tokio::test]
    async fn test_status_polling_escalates_delay() {
        let mut statuses: Vec<_> = (0..8).map(|_| running("Analyzing")).collect();
        statuses.push(Ok(TaskStatus::Done));
        let mut appliance = ScriptedAppliance::with_script(statuses, vec![verdict_report(2, "")]);
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 0).await;

        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(sleeper.secs(), vec![5, 10, 15, 20, 25, 30, 30, 30]);
        assert_eq!(out, "........");
    }

    #[tokio::test]
    async fn test_analysis_failure_exits_minus_three() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![running("Waiting"), Ok(TaskStatus::Failed("Analysis failed".to_string()))],
            vec![],
        );
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 0).await;

        assert_eq!(outcome.exit_code(), -3);
        assert_eq!(appliance.count("disconnect"), 1);
        assert_eq!(appliance.count("report"), 0);
        assert!(out.contains("Analysis failed"));
    }

    #[tokio::test]
    async fn test_status_error_exits_minus_three() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![Err(AtdError::ApiError { status: 500, body: "oops".to_string() })],
            vec![],
        );
        let sleeper = RecordingSleeper::default();

        let (outcome, _) = run(&mut appliance, &sleeper, 0).await;

        assert_eq!(outcome.exit_code(), -3);
        assert_eq!(appliance.count("disconnect"), 1);
    }

    #[tokio::test]
    async fn test_done_moves_straight_to_report() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![running("Waiting"), Ok(TaskStatus::Done)],
            vec![verdict_report(3, "Suspicious")],
        );
        let sleeper = RecordingSleeper::default();

        run(&mut appliance, &sleeper, 0).await;

        assert_eq!(
            appliance.calls(),
            vec!["connect", "heartbeat", "upload", "status", "status", "report", "disconnect"]
        );
    }

    #[tokio::test]
    async fn test_report_not_available_exits_zero() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![Ok(TaskStatus::Done)],
            vec![Ok(ReportStatus::NotAvailable("Report not found".to_string()))],
        );
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 1).await;

        assert_eq!(outcome, Outcome::ReportNotAvailable);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(appliance.count("disconnect"), 1);
        assert!(out.contains("Report not found"));
        assert!(!out.contains("Severity"));
    }

    #[tokio::test]
    async fn test_report_error_exits_minus_four() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![Ok(TaskStatus::Done)],
            vec![Err(AtdError::ApiError { status: 404, body: "no job".to_string() })],
        );
        let sleeper = RecordingSleeper::default();

        let (outcome, _) = run(&mut appliance, &sleeper, 0).await;

        assert_eq!(outcome.exit_code(), -4);
        assert_eq!(appliance.count("disconnect"), 1);
    }

    #[tokio::test]
    async fn test_missing_severity_exits_minus_four() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![Ok(TaskStatus::Done)],
            vec![Ok(ReportStatus::Available(json!({"Summary": {"Verdict": {"Description": "x"}}})))],
        );
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 0).await;

        assert_eq!(outcome.exit_code(), -4);
        assert_eq!(appliance.count("disconnect"), 1);
        assert!(out.contains("Could not read the verdict"));
    }

    #[tokio::test]
    async fn test_non_object_report_exits_minus_four() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![Ok(TaskStatus::Done)],
            vec![Ok(ReportStatus::Available(json!([])))],
        );
        let sleeper = RecordingSleeper::default();

        let (outcome, _) = run(&mut appliance, &sleeper, 0).await;

        assert_eq!(outcome.exit_code(), -4);
        assert_eq!(appliance.count("report"), 1);
        assert_eq!(appliance.count("disconnect"), 1);
        assert!(sleeper.secs().is_empty());
    }

    #[tokio::test]
    async fn test_verbose_dumps_upload_and_report() {
        let mut appliance =
            ScriptedAppliance::with_script(vec![Ok(TaskStatus::Done)], vec![verdict_report(4, "Trojan")]);
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 3).await;

        assert_eq!(outcome.exit_code(), 4);
        assert!(out.contains("ATD Box heartbeat: 1"));
        assert!(out.contains("Session Value:     tok"));
        assert!(out.contains("\"job_id\": \"J1\""));
        assert!(out.contains("\"task_id\": \"T1\""));
        let pretty_report = serde_json::to_string_pretty(&json!({
            "Summary": {"Verdict": {"Severity": 4, "Description": "Trojan"}}
        }))
        .unwrap();
        assert!(out.contains(&pretty_report));
    }

    #[tokio::test]
    async fn test_pending_report_waits_fixed_interval() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![Ok(TaskStatus::Done)],
            vec![
                Ok(ReportStatus::Pending("Generating".to_string())),
                Ok(ReportStatus::Pending("Generating".to_string())),
                verdict_report(5, "Ransomware"),
            ],
        );
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 1).await;

        assert_eq!(outcome.exit_code(), 5);
        assert_eq!(sleeper.secs(), vec![30, 30]);
        assert!(out.contains("Generating - Waiting for 30 seconds..."));
    }

    #[tokio::test]
    async fn test_exit_code_equals_severity() {
        for severity in 0..=5u8 {
            let mut appliance =
                ScriptedAppliance::with_script(vec![Ok(TaskStatus::Done)], vec![verdict_report(severity, "")]);
            let sleeper = RecordingSleeper::default();

            let (outcome, _) = run(&mut appliance, &sleeper, 0).await;

            assert_eq!(outcome.exit_code(), i32::from(severity));
        }
    }

    #[tokio::test]
    async fn test_trojan_scenario() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![running("Waiting"), running("Analyzing"), Ok(TaskStatus::Done)],
            vec![verdict_report(4, "Trojan")],
        );
        let sleeper = RecordingSleeper::default();

        let (outcome, out) = run(&mut appliance, &sleeper, 1).await;

        assert_eq!(outcome.exit_code(), 4);
        assert_eq!(sleeper.secs(), vec![5, 10]);
        assert!(out.contains("Waiting - Waiting for 5 seconds"));
        assert!(out.contains("Analyzing - Waiting for 10 seconds"));
        assert!(out.contains("File a.exe uploaded"));
        assert!(out.contains(" Severity:    4"));
        assert!(out.contains(" Description: Trojan"));
    }

    #[tokio::test]
    async fn test_quiet_verbosity_zero_prints_nothing_on_success() {
        let mut appliance = ScriptedAppliance::with_script(
            vec![running("Waiting"), Ok(TaskStatus::Done)],
            vec![verdict_report(4, "Trojan")],
        );
        let sleeper = RecordingSleeper::default();
        let mut console = Console::new(Vec::new(), 0, true);

        let outcome = Workflow::new(&mut appliance, &sleeper, &mut console)
            .submit(&credentials(), Path::new("a.exe"), "24")
            .await;

        assert_eq!(outcome.exit_code(), 4);
        assert!(console.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_list_profiles() {
        let mut appliance = ScriptedAppliance::default();
        let sleeper = RecordingSleeper::default();
        let mut console = Console::new(Vec::new(), 0, false);

        let outcome = Workflow::new(&mut appliance, &sleeper, &mut console)
            .list_profiles(&credentials())
            .await;

        assert_eq!(outcome, Outcome::ProfilesListed);
        assert_eq!(appliance.calls(), vec!["connect", "profiles", "disconnect"]);
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert!(out.contains("Win10 x64"));
    }

    #[tokio::test]
    async fn test_list_profiles_failure_exits_minus_five() {
        let mut appliance = ScriptedAppliance { fail_profiles: true, ..Default::default() };
        let sleeper = RecordingSleeper::default();
        let mut console = Console::new(Vec::new(), 0, false);

        let outcome = Workflow::new(&mut appliance, &sleeper, &mut console)
            .list_profiles(&credentials())
            .await;

        assert_eq!(outcome.exit_code(), -5);
        assert_eq!(appliance.count("disconnect"), 1);
    }
}
