//! # Reward Policy
//!
//! Named reward funds and the hourly liquidity reward.
//!
//! Before reward funds exist the content share of inflation accumulates in
//! `total_reward_fund_steem`. Once they are created that balance moves into
//! the post fund and every later block splits its content reward across the
//! funds by their content percentage.
//!
//! Market makers accumulate volume in a [`LiquidityRewardBalance`]; every
//! `LIQUIDITY_REWARD_BLOCKS` the heaviest tracker is paid and reset.

use super::{add_to, sub_from, AccountPolicy, AssetPolicy};
use primitive_types::U256;

use crate::algorithms::{calculate_claims, get_rshare_reward, percent_reward_per_hour, RewardContext};
use crate::domain::constants::{
    COMMENT_REWARD_FUND_NAME, COMMENT_REWARD_FUND_PERCENT, LIQUIDITY_APR_PERCENT,
    LIQUIDITY_REWARD_BLOCKS, LIQUIDITY_TIMEOUT_SEC, MIN_LIQUIDITY_REWARD, PERCENT_100,
    POST_REWARD_FUND_NAME, POST_REWARD_FUND_PERCENT,
};
use crate::domain::hardfork;
use crate::domain::{
    AccountName, Asset, ChainError, InternalError, LiquidityRewardBalance, RewardFund,
    VirtualOperation,
};
use crate::state::{name_key, ChainState};

/// Reward funds and liquidity incentives.
pub trait RewardPolicy {
    /// Creates the post and comment funds, seeding the post fund with the
    /// legacy content pool.
    fn create_reward_funds(&mut self) -> Result<(), ChainError>;

    /// Splits `reward` across the funds. Returns the amount actually
    /// deposited, which can be less than `reward` after rounding.
    fn pay_reward_funds(&mut self, reward: i64) -> Result<i64, ChainError>;

    /// Pays `rshares` out of the fund called `fund`, capped at `max_sbd`.
    fn claim_rshare_reward(
        &mut self,
        fund: &str,
        rshares: i64,
        reward_weight: u16,
        max_sbd: Asset,
    ) -> Result<Asset, ChainError>;

    /// Records market-making volume for `owner`.
    fn adjust_liquidity_reward(
        &mut self,
        owner: &AccountName,
        volume: Asset,
        is_sbd: bool,
    ) -> Result<(), ChainError>;

    /// This hour's liquidity reward; zero once liquidity rewards are retired.
    fn get_liquidity_reward(&self) -> Result<Asset, ChainError>;

    /// Pays the heaviest liquidity provider on reward blocks.
    fn pay_liquidity_reward(&mut self) -> Result<(), ChainError>;

    /// Recomputes every tracker's weight with the minimum-volume rule.
    fn retally_liquidity_weight(&mut self) -> Result<(), ChainError>;
}

impl RewardPolicy for ChainState {
    fn create_reward_funds(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let legacy_pool = self.props()?.total_reward_fund_steem;

        let mut post = RewardFund::new(POST_REWARD_FUND_NAME, POST_REWARD_FUND_PERCENT, now);
        post.reward_balance = legacy_pool;
        self.db.create(post)?;
        self.db.create(RewardFund::new(
            COMMENT_REWARD_FUND_NAME,
            COMMENT_REWARD_FUND_PERCENT,
            now,
        ))?;

        self.modify_props(|p| p.total_reward_fund_steem = Asset::steem(0))?;
        tracing::info!(seeded = %legacy_pool, "reward funds created");
        Ok(())
    }

    fn pay_reward_funds(&mut self, reward: i64) -> Result<i64, ChainError> {
        let now = self.head_block_time()?;
        let funds: Vec<RewardFund> = self.db.all::<RewardFund>().cloned().collect();

        let mut used = 0i64;
        for fund in funds {
            let share = i128::from(reward) * i128::from(fund.percent_content_rewards)
                / i128::from(PERCENT_100);
            let share = i64::try_from(share)
                .map_err(|_| InternalError::Invariant("reward fund share exceeds i64".into()))?;
            self.db.try_modify::<RewardFund, _>(fund.id, |f| {
                add_to(&mut f.reward_balance, Asset::steem(share))?;
                f.last_update = now;
                Ok(())
            })?;
            used += share;
        }

        if used > reward {
            return Err(InternalError::Invariant(format!(
                "reward funds used {used} of {reward}"
            ))
            .into());
        }
        Ok(used)
    }

    fn claim_rshare_reward(
        &mut self,
        fund: &str,
        rshares: i64,
        reward_weight: u16,
        max_sbd: Asset,
    ) -> Result<Asset, ChainError> {
        let record = self
            .db
            .get_by::<RewardFund>(RewardFund::BY_NAME, &RewardFund::name_key(fund))?
            .clone();
        let claims = calculate_claims(rshares.max(0) as u128, record.content_constant);
        if claims > U256::from(u128::MAX) {
            return Err(InternalError::Invariant(format!("claims on {fund} exceed u128")).into());
        }
        let claims = claims.as_u128();
        let recent_claims = record
            .recent_claims
            .checked_add(claims)
            .ok_or_else(|| InternalError::Invariant(format!("recent claims on {fund} overflow")))?;

        let ctx = RewardContext {
            rshares,
            reward_weight,
            max_sbd,
            total_reward_shares2: recent_claims,
            total_reward_fund_steem: record.reward_balance,
            current_steem_price: self.feed_history()?.current_median_history,
            content_constant: record.content_constant,
        };
        let payout = Asset::steem(get_rshare_reward(&ctx)?.max(0));

        self.db.try_modify::<RewardFund, _>(record.id, |f| {
            f.recent_claims = recent_claims;
            sub_from(&mut f.reward_balance, payout)?;
            Ok(())
        })?;
        Ok(payout)
    }

    fn adjust_liquidity_reward(
        &mut self,
        owner: &AccountName,
        volume: Asset,
        is_sbd: bool,
    ) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let existing = self
            .db
            .find_by::<LiquidityRewardBalance>(LiquidityRewardBalance::BY_OWNER, &name_key(owner))
            .map(|b| b.id);

        match existing {
            Some(id) => {
                let min_volume = self.has_hardfork(hardfork::LIQUIDITY_MIN_VOLUME);
                self.db.modify::<LiquidityRewardBalance, _>(id, |b| {
                    if now.since(b.last_update) >= LIQUIDITY_TIMEOUT_SEC {
                        b.steem_volume = 0;
                        b.sbd_volume = 0;
                        b.weight = 0;
                    }
                    if is_sbd {
                        b.sbd_volume += volume.amount;
                    } else {
                        b.steem_volume += volume.amount;
                    }
                    b.update_weight(min_volume);
                    b.last_update = now;
                })
            }
            None => {
                let mut balance = LiquidityRewardBalance::new(owner.clone(), now);
                if is_sbd {
                    balance.sbd_volume = volume.amount;
                } else {
                    balance.steem_volume = volume.amount;
                }
                balance.update_weight(self.has_hardfork(hardfork::LIQUIDITY_MIN_VOLUME_CREATE));
                self.db.create(balance)?;
                Ok(())
            }
        }
    }

    fn get_liquidity_reward(&self) -> Result<Asset, ChainError> {
        if self.has_hardfork(hardfork::NO_LIQUIDITY_REWARD) {
            return Ok(Asset::steem(0));
        }
        let per_hour = percent_reward_per_hour(self.props()?.virtual_supply.amount, LIQUIDITY_APR_PERCENT);
        Ok(Asset::steem(per_hour.max(MIN_LIQUIDITY_REWARD)))
    }

    fn pay_liquidity_reward(&mut self) -> Result<(), ChainError> {
        if !self.flags().liquidity_rewards_enabled
            || self.head_block_num()? % LIQUIDITY_REWARD_BLOCKS != 0
        {
            return Ok(());
        }
        let reward = self.get_liquidity_reward()?;
        if reward.amount == 0 {
            return Ok(());
        }

        let Some(winner) = self
            .db
            .iter::<LiquidityRewardBalance>(LiquidityRewardBalance::BY_VOLUME_WEIGHT)
            .next()
            .filter(|b| b.volume_weight() > 0)
            .cloned()
        else {
            return Ok(());
        };

        let now = self.head_block_time()?;
        self.adjust_supply(reward, true)?;
        self.adjust_balance(&winner.owner, reward)?;
        self.db.modify::<LiquidityRewardBalance, _>(winner.id, |b| {
            b.steem_volume = 0;
            b.sbd_volume = 0;
            b.weight = 0;
            b.last_update = now;
        })?;
        tracing::debug!(owner = %winner.owner, payout = %reward, "liquidity reward paid");
        self.push_virtual_operation(VirtualOperation::LiquidityReward {
            owner: winner.owner,
            payout: reward,
        });
        Ok(())
    }

    fn retally_liquidity_weight(&mut self) -> Result<(), ChainError> {
        let ids: Vec<_> = self
            .db
            .all::<LiquidityRewardBalance>()
            .map(|b| b.id)
            .collect();
        for id in ids {
            self.db
                .modify::<LiquidityRewardBalance, _>(id, |b| b.update_weight(true))?;
        }
        Ok(())
    }
}
