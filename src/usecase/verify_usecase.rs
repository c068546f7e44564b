use std::{sync::Arc, time::Duration};

use chrono::Utc;
use rand_core::{OsRng, TryRngCore};
use subtle::{Choice, ConstantTimeEq};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, warn};

use crate::domain::{
    error::DomainError,
    models::{
        account::Account,
        credential::{DIGEST_LEN, PasswordDigest},
        verification::{VerificationRequest, VerificationResult},
    },
    repositories::credential_repository::CredentialRepository,
    services::password_service::PasswordHasher,
};

/// Outcome of a full-length digest comparison
struct Comparison {
    equal: Choice,
    iterations: usize,
}

/// Compare two digests without an early exit.
///
/// Every position is visited exactly once and folded into one accumulator,
/// so the work done depends only on `DIGEST_LEN`.
fn compare_digests(input: &PasswordDigest, stored: &PasswordDigest) -> Comparison {
    let mut diff = 0u8;
    let mut iterations = 0usize;
    for (lhs, rhs) in input.as_bytes().iter().zip(stored.as_bytes().iter()) {
        diff |= lhs ^ rhs;
        iterations += 1;
    }

    Comparison {
        equal: diff.ct_eq(&0),
        iterations,
    }
}

/// The only place where submitted secrets are checked against stored ones
pub struct VerifyUsecase<C: CredentialRepository, P: PasswordHasher> {
    credential_repository: C,
    password_hasher: P,
    dummy_digest: PasswordDigest,
    delay: Duration,
}

impl<C: CredentialRepository, P: PasswordHasher> VerifyUsecase<C, P> {
    /// Build the verifier and draw its dummy digest.
    ///
    /// `delay` is the wall-clock time every completed verification takes,
    /// measured from the moment `verify` is entered.
    pub fn new(
        credential_repository: C,
        password_hasher: P,
        delay: Duration,
    ) -> Result<Self, DomainError> {
        let mut bytes = [0u8; DIGEST_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| DomainError::Randomness(e.to_string()))?;

        Ok(Self {
            credential_repository,
            password_hasher,
            dummy_digest: PasswordDigest::new(bytes),
            delay,
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn credential_repository(&self) -> &C {
        &self.credential_repository
    }

    /// Sorted usernames of every registered account
    pub async fn registered_usernames(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.credential_repository.usernames().await?)
    }

    pub async fn verify(&self, username: &str, password: &str) -> VerificationResult {
        let started = Instant::now();

        if username.is_empty() || password.is_empty() {
            return VerificationResult::malformed_request();
        }

        // hash before the lookup so unknown users pay the same cost
        let (input_digest, hashed) = match self.password_hasher.digest(password) {
            Ok(digest) => (digest, Choice::from(1)),
            Err(e) => {
                error!(error = %e, "password hashing failed");
                (self.dummy_digest.clone(), Choice::from(0))
            }
        };

        let account = match self.credential_repository.lookup(username).await {
            Ok(account) => account,
            Err(e) => {
                error!(error = %e, "credential lookup failed");
                None
            }
        };

        let exists = Choice::from(u8::from(account.is_some()));
        let stored_digest = account
            .as_ref()
            .map_or(&self.dummy_digest, Account::password_digest);
        let comparison = compare_digests(&input_digest, stored_digest);
        debug_assert_eq!(DIGEST_LEN, comparison.iterations);
        let matched: bool = (exists & comparison.equal & hashed).into();

        let result = match account {
            Some(account) if matched => {
                match self
                    .credential_repository
                    .record_login(username, Utc::now())
                    .await
                {
                    Ok(at) => VerificationResult::success(account.with_last_login(at)),
                    Err(e) => {
                        warn!(error = %e, username, "failed to record login");
                        VerificationResult::success(account)
                    }
                }
            }
            _ => VerificationResult::invalid_credentials(),
        };

        self.hold_until(started).await;

        debug!(username, outcome = ?result.outcome(), "verification finished");
        result
    }

    /// Run `verify` on its own task.
    ///
    /// Dropping the returned future does not stop the verification, so a
    /// client hanging up cannot cut the uniform delay short.
    pub async fn verify_to_completion(
        self: &Arc<Self>,
        request: VerificationRequest,
    ) -> VerificationResult
    where
        C: 'static,
        P: 'static,
    {
        let usecase = Arc::clone(self);
        let handle =
            tokio::spawn(async move { usecase.verify(&request.username, &request.password).await });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "verification task failed");
                VerificationResult::invalid_credentials()
            }
        }
    }

    async fn hold_until(&self, started: Instant) {
        let deadline = started + self.delay;
        let now = Instant::now();
        if now > deadline {
            warn!(
                overrun_ms = u64::try_from((now - deadline).as_millis()).unwrap_or(u64::MAX),
                "verification exceeded the uniform delay"
            );
        }
        sleep_until(deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::DateTime;
    use rstest::*;

    use super::*;
    use crate::{
        domain::{
            error::RepositoryError,
            models::{account::Role, credential::Registration, verification::Outcome},
            services::password_service::HashAlgorithm,
        },
        infrastructure::{
            argon2_password_hasher::Argon2PasswordHasher,
            in_memory_credential_repository::InMemoryCredentialRepository,
            sha256_password_hasher::Sha256PasswordHasher,
        },
    };

    const DELAY: Duration = Duration::from_millis(100);

    type Usecase = VerifyUsecase<InMemoryCredentialRepository, Sha256PasswordHasher>;

    fn registrations() -> Vec<Registration> {
        vec![
            Registration::new("admin", "secret123", Role::Admin),
            Registration::new("user", "user_password", Role::User),
            Registration::new("operator", "pässwörd", Role::Operator),
        ]
    }

    fn build(delay: Duration) -> Usecase {
        let hasher = Sha256PasswordHasher::new();
        let repository = InMemoryCredentialRepository::load(registrations(), &hasher).unwrap();
        VerifyUsecase::new(repository, hasher, delay).unwrap()
    }

    #[fixture]
    fn usecase() -> Usecase {
        build(DELAY)
    }

    // mock hasher that can never produce a digest
    #[derive(Clone)]
    struct FailingPasswordHasher;

    impl PasswordHasher for FailingPasswordHasher {
        fn algorithm(&self) -> HashAlgorithm {
            HashAlgorithm::Sha256
        }

        fn digest(&self, _plain_password: &str) -> Result<PasswordDigest, DomainError> {
            Err(DomainError::Hashing("mock failure".to_string()))
        }
    }

    // mock repository whose lookup takes a while to answer
    #[derive(Clone)]
    struct SlowCredentialRepository {
        inner: InMemoryCredentialRepository,
        latency: Duration,
    }

    #[async_trait]
    impl CredentialRepository for SlowCredentialRepository {
        async fn lookup(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
            tokio::time::sleep(self.latency).await;
            self.inner.lookup(username).await
        }

        async fn record_login(
            &self,
            username: &str,
            at: DateTime<Utc>,
        ) -> Result<DateTime<Utc>, RepositoryError> {
            self.inner.record_login(username, at).await
        }

        async fn usernames(&self) -> Result<Vec<String>, RepositoryError> {
            self.inner.usernames().await
        }
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_verify_admin_positive(usecase: Usecase) {
        let called_at = Utc::now();
        let result = usecase.verify("admin", "secret123").await;

        assert_eq!(Outcome::Success, result.outcome());
        let account = result.account().unwrap();
        assert_eq!(Role::Admin, account.role());
        assert!(account.last_login().unwrap() >= called_at);

        let stored = usecase
            .credential_repository()
            .lookup("admin")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.last_login().unwrap() >= called_at);
    }

    #[rstest]
    #[case("admin", "secret123")]
    #[case("user", "user_password")]
    #[case("operator", "pässwörd")]
    #[tokio::test(start_paused = true)]
    async fn test_verify_every_registration_positive(
        usecase: Usecase,
        #[case] username: &str,
        #[case] password: &str,
    ) {
        assert!(usecase.verify(username, password).await.is_success());
    }

    #[rstest]
    #[case("admin", "wrong")]
    #[case("admin", "secret124")]
    #[case("admin", "Secret123")]
    #[case("admin", "secret123 ")]
    #[case("admin", "ecret123")]
    #[case("operator", "passwörd")]
    #[tokio::test(start_paused = true)]
    async fn test_verify_wrong_password_negative(
        usecase: Usecase,
        #[case] username: &str,
        #[case] password: &str,
    ) {
        let result = usecase.verify(username, password).await;
        assert_eq!(Outcome::InvalidCredentials, result.outcome());
        assert!(result.account().is_none());

        let stored = usecase
            .credential_repository()
            .lookup(username)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(None, stored.last_login());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_verify_unknown_user_negative(usecase: Usecase) {
        let result = usecase.verify("ghost", "anything").await;
        assert_eq!(Outcome::InvalidCredentials, result.outcome());
        assert!(result.account().is_none());
    }

    #[rstest]
    #[case("", "x")]
    #[case("admin", "")]
    #[case("", "")]
    #[tokio::test(start_paused = true)]
    async fn test_verify_malformed_negative(
        usecase: Usecase,
        #[case] username: &str,
        #[case] password: &str,
    ) {
        let result = usecase.verify(username, password).await;
        assert_eq!(Outcome::MalformedRequest, result.outcome());
        assert!(result.account().is_none());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_verify_twice_updates_last_login(usecase: Usecase) {
        let first = usecase.verify("user", "user_password").await;
        let first_login = first.account().unwrap().last_login().unwrap();

        let second = usecase.verify("user", "user_password").await;
        let second_login = second.account().unwrap().last_login().unwrap();

        assert!(first.is_success());
        assert!(second.is_success());
        assert!(second_login >= first_login);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_failures_take_the_uniform_delay(usecase: Usecase) {
        let started = Instant::now();
        let ghost = usecase.verify("ghost", "wrongpass").await;
        let ghost_elapsed = started.elapsed();

        let started = Instant::now();
        let wrong = usecase.verify("admin", "wrongpass").await;
        let wrong_elapsed = started.elapsed();

        let started = Instant::now();
        let success = usecase.verify("admin", "secret123").await;
        let success_elapsed = started.elapsed();

        assert_eq!(Outcome::InvalidCredentials, ghost.outcome());
        assert_eq!(Outcome::InvalidCredentials, wrong.outcome());
        assert!(success.is_success());

        for elapsed in [ghost_elapsed, wrong_elapsed, success_elapsed] {
            assert!(elapsed >= DELAY);
            assert!(elapsed.abs_diff(ghost_elapsed) < Duration::from_millis(1));
        }
    }

    #[tokio::test]
    async fn test_unknown_user_latency_matches_wrong_password() {
        const TRIALS: usize = 15;
        let delay = Duration::from_millis(30);
        let usecase = build(delay);

        let mut ghost = Vec::with_capacity(TRIALS);
        let mut wrong = Vec::with_capacity(TRIALS);
        for _ in 0..TRIALS {
            let started = std::time::Instant::now();
            usecase.verify("ghost", "anything1").await;
            ghost.push(started.elapsed());

            let started = std::time::Instant::now();
            usecase.verify("admin", "anything1").await;
            wrong.push(started.elapsed());
        }
        ghost.sort();
        wrong.sort();

        let ghost_median = ghost[TRIALS / 2];
        let wrong_median = wrong[TRIALS / 2];
        assert!(ghost_median >= delay);
        assert!(wrong_median >= delay);
        assert!(ghost_median.abs_diff(wrong_median) < Duration::from_millis(10));
    }

    #[test]
    fn test_compare_iterations_independent_of_mismatch_position() {
        let stored = PasswordDigest::new([0x5a; DIGEST_LEN]);

        let mut first = *stored.as_bytes();
        first[0] ^= 0xff;
        let mut last = *stored.as_bytes();
        last[DIGEST_LEN - 1] ^= 0x01;

        let at_first = compare_digests(&PasswordDigest::new(first), &stored);
        let at_last = compare_digests(&PasswordDigest::new(last), &stored);
        let identical = compare_digests(&stored, &stored);

        assert_eq!(DIGEST_LEN, at_first.iterations);
        assert_eq!(DIGEST_LEN, at_last.iterations);
        assert_eq!(DIGEST_LEN, identical.iterations);
        assert!(!bool::from(at_first.equal));
        assert!(!bool::from(at_last.equal));
        assert!(bool::from(identical.equal));
    }

    #[test]
    fn test_compare_time_independent_of_mismatch_position() {
        const ROUNDS: usize = 20_000;
        let stored = PasswordDigest::new([0x5a; DIGEST_LEN]);
        let mut first = *stored.as_bytes();
        first[0] ^= 0xff;
        let mut last = *stored.as_bytes();
        last[DIGEST_LEN - 1] ^= 0x01;
        let (first, last) = (PasswordDigest::new(first), PasswordDigest::new(last));

        let mut first_total = Duration::ZERO;
        let mut last_total = Duration::ZERO;
        // interleave batches so drift hits both sides alike
        for _ in 0..10 {
            let started = std::time::Instant::now();
            for _ in 0..ROUNDS {
                std::hint::black_box(compare_digests(
                    std::hint::black_box(&first),
                    &stored,
                ));
            }
            first_total += started.elapsed();

            let started = std::time::Instant::now();
            for _ in 0..ROUNDS {
                std::hint::black_box(compare_digests(std::hint::black_box(&last), &stored));
            }
            last_total += started.elapsed();
        }

        let ratio = first_total.as_secs_f64() / last_total.as_secs_f64();
        assert!((0.33..3.0).contains(&ratio), "ratio {ratio}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dummy_digest_exists_for_empty_store() {
        let hasher = Sha256PasswordHasher::new();
        let repository = InMemoryCredentialRepository::load(Vec::new(), &hasher).unwrap();
        let usecase = VerifyUsecase::new(repository, hasher, DELAY).unwrap();

        let started = Instant::now();
        let result = usecase.verify("admin", "secret123").await;
        assert_eq!(Outcome::InvalidCredentials, result.outcome());
        assert!(started.elapsed() >= DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hashing_failure_is_invalid_credentials() {
        let repository =
            InMemoryCredentialRepository::load(registrations(), &Sha256PasswordHasher::new())
                .unwrap();
        let usecase = VerifyUsecase::new(repository, FailingPasswordHasher, DELAY).unwrap();

        let started = Instant::now();
        let result = usecase.verify("admin", "secret123").await;
        assert_eq!(Outcome::InvalidCredentials, result.outcome());
        assert!(started.elapsed() >= DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_with_argon2() {
        let hasher = Argon2PasswordHasher::with_params("deployment-salt", 8, 1, 1).unwrap();
        let repository = InMemoryCredentialRepository::load(registrations(), &hasher).unwrap();
        let usecase = VerifyUsecase::new(repository, hasher, DELAY).unwrap();

        assert!(usecase.verify("admin", "secret123").await.is_success());
        assert_eq!(
            Outcome::InvalidCredentials,
            usecase.verify("admin", "secret12").await.outcome()
        );
        assert_eq!(
            Outcome::InvalidCredentials,
            usecase.verify("ghost", "secret123").await.outcome()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_caller_does_not_cancel_verification() {
        let hasher = Sha256PasswordHasher::new();
        let inner = InMemoryCredentialRepository::load(registrations(), &hasher).unwrap();
        let repository = SlowCredentialRepository {
            inner: inner.clone(),
            latency: Duration::from_millis(50),
        };
        let usecase = Arc::new(VerifyUsecase::new(repository, hasher, DELAY).unwrap());

        let attempt = usecase.verify_to_completion(VerificationRequest::new("admin", "secret123"));
        let timed_out = tokio::time::timeout(Duration::from_millis(10), attempt).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(DELAY * 2).await;
        let account = inner.lookup("admin").await.unwrap().unwrap();
        assert!(account.last_login().is_some());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_verify_to_completion_positive(usecase: Usecase) {
        let usecase = Arc::new(usecase);
        let result = usecase
            .verify_to_completion(VerificationRequest::new("admin", "secret123"))
            .await;
        assert!(result.is_success());
    }

    // mock repository whose store is unreadable
    #[derive(Clone)]
    struct BrokenCredentialRepository;

    #[async_trait]
    impl CredentialRepository for BrokenCredentialRepository {
        async fn lookup(&self, _username: &str) -> Result<Option<Account>, RepositoryError> {
            Err(RepositoryError::Storage("mock failure".to_string()))
        }

        async fn record_login(
            &self,
            _username: &str,
            _at: DateTime<Utc>,
        ) -> Result<DateTime<Utc>, RepositoryError> {
            Err(RepositoryError::Storage("mock failure".to_string()))
        }

        async fn usernames(&self) -> Result<Vec<String>, RepositoryError> {
            Err(RepositoryError::Storage("mock failure".to_string()))
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_registered_usernames_positive(usecase: Usecase) {
        assert_eq!(
            vec!["admin", "operator", "user"],
            usecase.registered_usernames().await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_registered_usernames_storage_failure_negative() {
        let usecase =
            VerifyUsecase::new(BrokenCredentialRepository, Sha256PasswordHasher::new(), DELAY)
                .unwrap();
        assert!(matches!(
            usecase.registered_usernames().await,
            Err(DomainError::Repository(RepositoryError::Storage(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_store_is_invalid_credentials() {
        let usecase =
            VerifyUsecase::new(BrokenCredentialRepository, Sha256PasswordHasher::new(), DELAY)
                .unwrap();
        let started = Instant::now();
        let result = usecase.verify("admin", "secret123").await;
        assert_eq!(Outcome::InvalidCredentials, result.outcome());
        assert!(started.elapsed() >= DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_slower_than_delay_returns_without_extra_wait() {
        let hasher = Sha256PasswordHasher::new();
        let repository = SlowCredentialRepository {
            inner: InMemoryCredentialRepository::load(registrations(), &hasher).unwrap(),
            latency: DELAY * 3,
        };
        let usecase = VerifyUsecase::new(repository, hasher, DELAY).unwrap();

        let started = Instant::now();
        assert!(usecase.verify("admin", "secret123").await.is_success());
        let elapsed = started.elapsed();
        assert!(elapsed >= DELAY * 3 && elapsed < DELAY * 4);
    }
}
