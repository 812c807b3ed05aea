/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

/*
 * A lattice of abstract values. Every implementation must satisfy:
 *
 *   - bottom <= a <= top for every a,
 *   - a <= a.join(b) and b <= a.join(b),
 *   - a.meet(b) <= a and a.meet(b) <= b,
 *   - a <= a.widen(b) and b <= a.widen(b), and every ascending chain
 *     produced by repeated widening stabilizes after finitely many steps,
 *   - a.meet(b) <= a.narrow(b) <= a when b <= a,
 *   - bottom is absorbing for meet and neutral for join.
 *
 * Equality (`Eq`) is semantic equality: two values are equal when they
 * describe the same set of concrete states, whatever their internal
 * representation.
 */
pub trait AbstractDomain: Clone + Eq {
    fn bottom() -> Self;
    fn top() -> Self;
    fn is_bottom(&self) -> bool;
    fn is_top(&self) -> bool;

    /// Partial order of the lattice.
    fn leq(&self, rhs: &Self) -> bool;

    fn equals(&self, rhs: &Self) -> bool {
        self.leq(rhs) && rhs.leq(self)
    }

    fn join(mut self, rhs: Self) -> Self {
        self.join_with(rhs);
        self
    }

    fn meet(mut self, rhs: Self) -> Self {
        self.meet_with(rhs);
        self
    }

    fn widen(mut self, rhs: Self) -> Self {
        self.widen_with(rhs);
        self
    }

    fn narrow(mut self, rhs: Self) -> Self {
        self.narrow_with(rhs);
        self
    }

    fn join_with(&mut self, rhs: Self);
    fn meet_with(&mut self, rhs: Self);
    fn widen_with(&mut self, rhs: Self);
    fn narrow_with(&mut self, rhs: Self);

    fn set_to_bottom(&mut self) {
        *self = Self::bottom();
    }

    fn set_to_top(&mut self) {
        *self = Self::top();
    }
}
