mod acceptor;
mod onboarding;
