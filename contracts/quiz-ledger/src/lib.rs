//! Stellarcade Quiz Ledger Contract
//!
//! A quiz-with-escrow game. A creator commits to a secret answer by hash and
//! sets an entry price; players pay at least that price for every guess. The
//! first correct guess takes the whole pot. If nobody solves the quiz before
//! its deadline, the creator claims the pot back.
//!
//! ## Game Flow
//! 1. Anyone calls `launch` with SHA-256(answer), a deadline at most 90 days
//!    out, an entry price and a metadata URI. The caller becomes the creator.
//! 2. Players call `guess` with a plaintext answer and a payment `>= price`.
//!    The payment joins the pot whether or not the guess is right.
//! 3. A matching guess records the winner and pays out the pot in the same
//!    invocation. The quiz is closed for good.
//! 4. After the deadline, an unsolved quiz can be closed by the creator with
//!    `claim`, which returns the pot.
//!
//! ## Storage Strategy
//! - `instance()` storage: Token address and the NextId counter. Small, fixed
//!   size, one ledger entry.
//! - `persistent()` storage: one `Quiz` entry per id, TTL extended on every
//!   write. Records are never removed so closed quizzes stay auditable.
//!
//! ## Fund Custody
//! Each invocation is atomic: an `Err` return or a trapped token transfer
//! rolls back every write, so `pledged` and `winner` can never disagree with
//! the token balances. A quiz with a winner or a claim always holds
//! `pledged == 0`.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token::TokenClient,
    Address, Bytes, BytesN, Env, String, Vec,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Longest allowed quiz lifetime: 90 days, in seconds.
pub const MAX_QUIZ_DURATION_SECS: u64 = 90 * 24 * 60 * 60;

/// Upper bound on the stored metadata URI, in bytes.
pub const MAX_METADATA_URI_LEN: u32 = 256;

/// Maximum number of quizzes returned by one `list_quizzes` page.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Persistent storage TTL in ledgers (~120 days at 5 s/ledger).
/// Covers the longest quiz lifetime plus a window for the creator's claim.
pub const QUIZ_BUMP_LEDGERS: u32 = 2_073_600;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized  = 1,
    NotInitialized      = 2,
    InvalidCommitment   = 3,
    InvalidDuration     = 4,
    InvalidAmount       = 5,
    MetadataTooLong     = 6,
    QuizNotFound        = 7,
    QuizExpired         = 8,
    SelfPlayForbidden   = 9,
    AlreadyWon          = 10,
    InsufficientPayment = 11,
    NotCreator          = 12,
    QuizStillOpen       = 13,
    AlreadyClaimed      = 14,
    Overflow            = 15,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// One launched quiz. Written at launch, updated by guesses and the claim,
/// never deleted.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Quiz {
    pub id:                u64,
    pub creator:           Address,
    /// SHA-256 of the secret answer, fixed at launch.
    pub answer_commitment: BytesN<32>,
    /// Minimum payment accepted per guess.
    pub price:             i128,
    /// Current pot. Grows with every guess; drops to zero exactly once.
    pub pledged:           i128,
    pub created_at:        u64,
    pub expires_at:        u64,
    pub metadata_uri:      String,
    /// Set by the first correct guess.
    pub winner:            Option<Address>,
    /// Set when the creator takes back an unsolved pot.
    pub claimed:           bool,
}

/// Lifecycle state of a quiz, derived from the record and the ledger clock.
///
/// `Expired` means the deadline passed without a winner and the creator has
/// not claimed yet.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum QuizStatus {
    Open    = 0,
    Won     = 1,
    Expired = 2,
    Claimed = 3,
}

/// Result of a single `guess` call.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum GuessOutcome {
    Lost = 0,
    Won  = 1,
}

/// Storage key discriminants.
///
/// Instance keys (Token, NextId): contract config and the id counter.
/// Persistent keys (Quiz): one entry per quiz with its own TTL.
#[contracttype]
pub enum DataKey {
    // --- instance() keys ---
    Token,
    /// Id the next `launch` will assign; equals the number of quizzes.
    NextId,
    // --- persistent() keys ---
    Quiz(u64),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct QuizLaunched {
    #[topic]
    pub id: u64,
    #[topic]
    pub creator: Address,
    pub end_time: u64,
    pub metadata_uri: String,
    pub price: i128,
}

#[contractevent]
pub struct GuessLost {
    #[topic]
    pub id: u64,
    #[topic]
    pub player: Address,
    /// Payment attached to this guess only, not the running pot.
    pub amount: i128,
}

#[contractevent]
pub struct QuizWon {
    #[topic]
    pub id: u64,
    #[topic]
    pub winner: Address,
    pub amount: i128,
}

#[contractevent]
pub struct PotClaimed {
    #[topic]
    pub id: u64,
    #[topic]
    pub creator: Address,
    pub amount: i128,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct QuizLedger;

#[contractimpl]
impl QuizLedger {
    // -----------------------------------------------------------------------
    // init
    // -----------------------------------------------------------------------

    /// Initialize the ledger with the SEP-41 token used for every entry fee
    /// and payout. May only be called once.
    pub fn init(env: Env, token: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Token) {
            return Err(Error::AlreadyInitialized);
        }

        env.storage().instance().set(&DataKey::Token, &token);
        env.storage().instance().set(&DataKey::NextId, &0u64);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // launch
    // -----------------------------------------------------------------------

    /// Launch a new quiz and return its id.
    ///
    /// `commitment` is `SHA-256(answer_bytes)` computed off-chain and must not
    /// be all zeroes. `end_time` is a ledger timestamp strictly after now and
    /// no more than `MAX_QUIZ_DURATION_SECS` ahead. `price` is the minimum
    /// payment per guess (0 allows free guesses).
    pub fn launch(
        env:          Env,
        creator:      Address,
        commitment:   BytesN<32>,
        end_time:     u64,
        price:        i128,
        metadata_uri: String,
    ) -> Result<u64, Error> {
        creator.require_auth();
        require_initialized(&env)?;

        if commitment == BytesN::from_array(&env, &[0u8; 32]) {
            return Err(Error::InvalidCommitment);
        }

        let now = env.ledger().timestamp();
        let latest_end = now.saturating_add(MAX_QUIZ_DURATION_SECS);
        if end_time <= now || end_time > latest_end {
            return Err(Error::InvalidDuration);
        }

        if price < 0 {
            return Err(Error::InvalidAmount);
        }

        if metadata_uri.len() > MAX_METADATA_URI_LEN {
            return Err(Error::MetadataTooLong);
        }

        let id = next_id(&env);
        let following = id.checked_add(1).ok_or(Error::Overflow)?;
        env.storage().instance().set(&DataKey::NextId, &following);

        let quiz = Quiz {
            id,
            creator:           creator.clone(),
            answer_commitment: commitment,
            price,
            pledged:           0,
            created_at:        now,
            expires_at:        end_time,
            metadata_uri:      metadata_uri.clone(),
            winner:            None,
            claimed:           false,
        };
        save_quiz(&env, &quiz);

        QuizLaunched { id, creator, end_time, metadata_uri, price }.publish(&env);

        Ok(id)
    }

    // -----------------------------------------------------------------------
    // guess
    // -----------------------------------------------------------------------

    /// Pay `amount` and submit `answer` for quiz `id`.
    ///
    /// Every check runs before the payment is collected. The payment is
    /// added to the pot even when the guess is wrong. A correct guess makes
    /// `player` the winner and transfers the entire pot to them in the same
    /// invocation.
    pub fn guess(
        env:    Env,
        player: Address,
        id:     u64,
        answer: Bytes,
        amount: i128,
    ) -> Result<GuessOutcome, Error> {
        player.require_auth();
        let token = get_token(&env)?;
        let mut quiz = load_quiz(&env, id)?;

        if env.ledger().timestamp() > quiz.expires_at {
            return Err(Error::QuizExpired);
        }
        if player == quiz.creator {
            return Err(Error::SelfPlayForbidden);
        }
        if quiz.winner.is_some() {
            return Err(Error::AlreadyWon);
        }
        if amount < 0 {
            return Err(Error::InvalidAmount);
        }
        if amount < quiz.price {
            return Err(Error::InsufficientPayment);
        }

        let token_client = TokenClient::new(&env, &token);
        if amount > 0 {
            token_client.transfer(&player, env.current_contract_address(), &amount);
        }
        quiz.pledged = quiz.pledged.checked_add(amount).ok_or(Error::Overflow)?;

        let answer_hash: BytesN<32> = env.crypto().sha256(&answer).into();
        if answer_hash != quiz.answer_commitment {
            save_quiz(&env, &quiz);
            GuessLost { id, player, amount }.publish(&env);
            return Ok(GuessOutcome::Lost);
        }

        let payout = quiz.pledged;
        quiz.winner = Some(player.clone());
        quiz.pledged = 0;

        // Record is settled before the outbound transfer.
        save_quiz(&env, &quiz);

        if payout > 0 {
            token_client.transfer(&env.current_contract_address(), &player, &payout);
        }

        QuizWon { id, winner: player, amount: payout }.publish(&env);

        Ok(GuessOutcome::Won)
    }

    // -----------------------------------------------------------------------
    // claim
    // -----------------------------------------------------------------------

    /// Return the pot of an expired, unsolved quiz to its creator.
    ///
    /// Succeeds once per quiz; a second call fails with `AlreadyClaimed`.
    /// An empty pot can still be claimed, which closes the quiz with a zero
    /// payout and no token call.
    ///
    /// The record's TTL is `QUIZ_BUMP_LEDGERS` from its last write. A
    /// 90-day quiz with no guesses leaves roughly 30 days after expiry to
    /// claim before the entry is archived and must be restored first.
    pub fn claim(env: Env, creator: Address, id: u64) -> Result<i128, Error> {
        creator.require_auth();
        let token = get_token(&env)?;
        let mut quiz = load_quiz(&env, id)?;

        if creator != quiz.creator {
            return Err(Error::NotCreator);
        }
        if env.ledger().timestamp() <= quiz.expires_at {
            return Err(Error::QuizStillOpen);
        }
        if quiz.winner.is_some() {
            return Err(Error::AlreadyWon);
        }
        if quiz.claimed {
            return Err(Error::AlreadyClaimed);
        }

        let payout = quiz.pledged;
        quiz.pledged = 0;
        quiz.claimed = true;
        save_quiz(&env, &quiz);

        if payout > 0 {
            TokenClient::new(&env, &token).transfer(
                &env.current_contract_address(),
                &creator,
                &payout,
            );
        }

        PotClaimed { id, creator, amount: payout }.publish(&env);

        Ok(payout)
    }

    // -----------------------------------------------------------------------
    // View functions
    // -----------------------------------------------------------------------

    /// Returns one page of quizzes in ascending id order.
    ///
    /// The page starts at id `offset` and holds at most
    /// `min(limit, MAX_PAGE_SIZE)` records. A page shorter than the requested
    /// size means the end of the ledger was reached.
    pub fn list_quizzes(env: Env, offset: u64, limit: u32) -> Vec<Quiz> {
        let mut page = Vec::new(&env);
        let count = next_id(&env);
        let size = limit.min(MAX_PAGE_SIZE) as u64;
        let end = offset.saturating_add(size).min(count);

        let mut id = offset;
        while id < end {
            if let Some(quiz) = env.storage().persistent().get(&DataKey::Quiz(id)) {
                page.push_back(quiz);
            }
            id += 1;
        }
        page
    }

    /// Returns the quiz record, or `None` if the id was never assigned.
    pub fn get_quiz(env: Env, id: u64) -> Option<Quiz> {
        env.storage().persistent().get(&DataKey::Quiz(id))
    }

    /// Returns the lifecycle state of a quiz at the current ledger time.
    pub fn quiz_status(env: Env, id: u64) -> Result<QuizStatus, Error> {
        let quiz = load_quiz(&env, id)?;
        Ok(status_of(&quiz, env.ledger().timestamp()))
    }

    /// Number of quizzes launched so far, which is also the next id.
    pub fn quiz_count(env: Env) -> u64 {
        next_id(&env)
    }

    /// Address of the token contract used for payments.
    pub fn token(env: Env) -> Result<Address, Error> {
        get_token(&env)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Token) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn get_token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .ok_or(Error::NotInitialized)
}

fn next_id(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::NextId)
        .unwrap_or(0)
}

fn load_quiz(env: &Env, id: u64) -> Result<Quiz, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Quiz(id))
        .ok_or(Error::QuizNotFound)
}

/// Write a quiz to persistent storage and extend its TTL in one step.
fn save_quiz(env: &Env, quiz: &Quiz) {
    let key = DataKey::Quiz(quiz.id);
    env.storage().persistent().set(&key, quiz);
    env.storage()
        .persistent()
        .extend_ttl(&key, QUIZ_BUMP_LEDGERS, QUIZ_BUMP_LEDGERS);
}

fn status_of(quiz: &Quiz, now: u64) -> QuizStatus {
    if quiz.winner.is_some() {
        QuizStatus::Won
    } else if quiz.claimed {
        QuizStatus::Claimed
    } else if now > quiz.expires_at {
        QuizStatus::Expired
    } else {
        QuizStatus::Open
    }
}
